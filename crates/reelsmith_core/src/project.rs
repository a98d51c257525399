use crate::error::Result;
use crate::types::*;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const PROJECT_EXTENSION: &str = "reelsmith";

impl Project {
    /// Create a new empty project with the given name and settings.
    pub fn new(name: impl Into<String>, settings: ArrangeSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            settings,
            ingredients: Default::default(),
            footage: Default::default(),
            timeline: Timeline::new(),
        }
    }

    /// Save project to a file as pretty-printed JSON.
    /// Appends the `.reelsmith` extension if not present and returns the
    /// path actually written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = ensure_extension(path.as_ref());
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Load a project from a JSON file. Clip start times are rebuilt from
    /// the stored order.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// Standard arrange settings: 40px per second, 5s clips up to 10s, 3s
/// transitions up to 5s.
pub fn default_settings() -> ArrangeSettings {
    ArrangeSettings::default()
}

fn ensure_extension(path: &Path) -> PathBuf {
    if path.extension().and_then(|e| e.to_str()) == Some(PROJECT_EXTENSION) {
        path.to_path_buf()
    } else {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(PROJECT_EXTENSION);
        path.with_file_name(name)
    }
}
