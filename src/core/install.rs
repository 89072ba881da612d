use crate::models::error::SError;
use crate::models::mod_dto::{ModId, ModInfo};
use camino::Utf8Path;

/// Turns a downloaded archive into a staged mod. Extraction and metadata
/// derivation live behind this seam.
pub trait InstallManager: Send + Sync {
    fn install(
        &self,
        download_id: &str,
        archive_path: &Utf8Path,
        game_id: &str,
        mod_info: &ModInfo,
        allow_auto_enable: bool,
        allow_auto_start: bool,
    ) -> Result<ModId, SError>;
}
