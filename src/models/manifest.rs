use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MANIFEST_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ActivationEntry {
    /// Id of the mod that owns the deployed file.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// Record of every file deployed into one data path, keyed by the path
/// relative to that data path (always `/`-separated).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ActivationManifest {
    pub version: u32,
    #[serde(default)]
    pub files: BTreeMap<String, ActivationEntry>,
}

impl Default for ActivationManifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            files: BTreeMap::new(),
        }
    }
}

impl ActivationManifest {
    pub fn owner_of(&self, rel: &str) -> Option<&str> {
        self.files.get(rel).map(|e| e.source.as_str())
    }

    pub fn files_owned_by(&self, mod_id: &str) -> Vec<String> {
        self.files
            .iter()
            .filter(|(_, e)| e.source == mod_id)
            .map(|(k, _)| k.clone())
            .collect()
    }
}

/// Normalizes a relative path into a manifest key.
pub fn manifest_key(rel: &Utf8Path) -> String {
    rel.components()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join("/")
}
