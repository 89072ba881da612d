use crate::models::error::SError;
use crate::models::manifest::ActivationManifest;
use crate::utils::id::hash_id;
use crate::utils::toml::Toml;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

/// Persists one activation manifest per (instance, data path).
///
/// Layout: `<root>/<instance id>/<hash of data path>.toml`.
#[derive(Clone, Debug)]
pub struct ActivationStore {
    root: Utf8PathBuf,
}

impl ActivationStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn manifest_path(&self, instance_id: &str, data_path: &Utf8Path) -> Utf8PathBuf {
        self.root
            .join(instance_id)
            .join(format!("{}.toml", hash_id(data_path.as_str())))
    }

    /// Loads the last saved manifest. A data path that was never deployed to
    /// yields an empty manifest.
    pub fn load(
        &self,
        instance_id: &str,
        data_path: &Utf8Path,
    ) -> Result<ActivationManifest, SError> {
        let path = self.manifest_path(instance_id, data_path);
        if !path.exists() {
            debug!("No activation manifest for {data_path}");
            return Ok(ActivationManifest::default());
        }
        Toml::read(&path)
    }

    pub fn save(
        &self,
        instance_id: &str,
        data_path: &Utf8Path,
        manifest: &ActivationManifest,
    ) -> Result<(), SError> {
        let path = self.manifest_path(instance_id, data_path);
        debug!("Saving {} entries for {data_path} to {path}", manifest.files.len());
        Toml::write(&path, manifest)
    }
}
