fn main() {
    medbag_reader_lib::run()
}
