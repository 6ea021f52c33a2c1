use medbag_capture::CaptureError;
use medbag_data::RegionKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("{kind} region: {source}")]
    Region {
        kind: RegionKind,
        #[source]
        source: CaptureError,
    },
    #[error("cannot normalize an empty region ({width}x{height})")]
    EmptyRegion { width: u32, height: u32 },
    #[error("text recognition failed: {0}")]
    RecognitionFailed(String),
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),
}
