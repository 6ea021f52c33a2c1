use anyhow::{Context, Result};
use medbag_capture::RelativeRect;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Identifier of the template every bag reader ships with
pub const DEFAULT_TEMPLATE: &str = "tvgh";

/// The three semantic fields printed on a medication bag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    Name,
    Medicine,
    Usage,
}

impl RegionKind {
    pub const ALL: [RegionKind; 3] = [RegionKind::Name, RegionKind::Medicine, RegionKind::Usage];

    /// Key used in template files
    pub fn key(&self) -> &'static str {
        match self {
            RegionKind::Name => "name",
            RegionKind::Medicine => "med",
            RegionKind::Usage => "usage",
        }
    }

    /// File stem for the saved crop, numbered like the preview labels
    pub fn crop_stem(&self) -> &'static str {
        match self {
            RegionKind::Name => "1_name",
            RegionKind::Medicine => "2_medicine",
            RegionKind::Usage => "3_usage",
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A bag layout: one relative rectangle per field
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub id: String,
    pub name: RelativeRect,
    pub med: RelativeRect,
    pub usage: RelativeRect,
}

impl Template {
    pub fn rect(&self, kind: RegionKind) -> &RelativeRect {
        match kind {
            RegionKind::Name => &self.name,
            RegionKind::Medicine => &self.med,
            RegionKind::Usage => &self.usage,
        }
    }

    /// Rectangles in preview order (name, medicine, usage)
    pub fn rects(&self) -> [RelativeRect; 3] {
        [self.name, self.med, self.usage]
    }

    /// Taipei Veterans General Hospital bag layout
    pub fn tvgh() -> Self {
        Self {
            id: DEFAULT_TEMPLATE.to_string(),
            name: RelativeRect::new(0.040, 0.175, 0.30, 0.045),
            med: RelativeRect::new(0.040, 0.210, 0.86, 0.055),
            usage: RelativeRect::new(0.040, 0.270, 0.86, 0.080),
        }
    }

    fn is_valid(&self) -> bool {
        RegionKind::ALL
            .iter()
            .all(|k| self.rect(*k).is_within_unit())
    }
}

/// Raw templates.json file format
#[derive(Debug, Deserialize)]
struct TemplatesFile {
    templates: HashMap<String, RawTemplate>,
}

#[derive(Debug, Deserialize)]
struct RawTemplate {
    name: [f64; 4],
    med: [f64; 4],
    usage: [f64; 4],
}

fn to_rect(v: [f64; 4]) -> RelativeRect {
    RelativeRect::new(v[0], v[1], v[2], v[3])
}

/// Lookup table of bag templates keyed by identifier
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        let mut registry = Self {
            templates: HashMap::new(),
        };
        registry.insert(Template::tvgh());
        registry
    }
}

impl TemplateRegistry {
    /// Built-in templates plus any found in `data_dir/templates.json`.
    /// File entries override built-ins with the same identifier.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let mut registry = Self::default();

        let templates_path = data_dir.join("templates.json");
        if templates_path.exists() {
            let content = std::fs::read_to_string(&templates_path)
                .context("Failed to read templates.json")?;
            let file: TemplatesFile =
                serde_json::from_str(&content).context("Failed to parse templates.json")?;

            for (id, raw) in file.templates {
                let template = Template {
                    id: id.clone(),
                    name: to_rect(raw.name),
                    med: to_rect(raw.med),
                    usage: to_rect(raw.usage),
                };
                if !registry.insert(template) {
                    tracing::warn!("Template '{}' has a region outside the image, skipped", id);
                }
            }

            tracing::info!("Loaded {} template(s)", registry.templates.len());
        } else {
            tracing::debug!(
                "No templates.json at {}, using built-in templates",
                templates_path.display()
            );
        }

        Ok(registry)
    }

    /// Register a template. Returns false (and keeps the registry unchanged)
    /// when any region leaves the unit square.
    pub fn insert(&mut self, template: Template) -> bool {
        if !template.is_valid() {
            return false;
        }
        self.templates.insert(template.id.clone(), template);
        true
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }

    /// Sorted template identifiers
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
