use arch::mem::MemoryLayout;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Assembler options, loadable from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Accept `$t0`-style register names.
    pub extended: bool,
    pub warnings_are_errors: bool,
    pub layout: MemoryLayout,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            extended: true,
            warnings_are_errors: false,
            layout: MemoryLayout::default(),
        }
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_yaml(&yaml).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}
