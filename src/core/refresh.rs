use crate::models::error::SError;
use crate::models::mod_dto::{Mod, ModId, ModInfo};
use crate::utils::time::to_unix_timestamp;
use camino::Utf8Path;
use std::collections::BTreeSet;
use std::io;
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RefreshDelta {
    /// On disk but unknown to the catalog.
    pub added: Vec<Mod>,
    /// In the catalog but without a staging directory.
    pub removed: Vec<ModId>,
}

impl RefreshDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub struct ModRefreshScanner;

impl ModRefreshScanner {
    /// Compares the staging directories under `install_path` with the mod ids
    /// the catalog knows. Each directory is one mod, named by its id.
    ///
    /// A missing or unreadable install root yields an empty delta, so an
    /// unplugged drive never prunes the catalog.
    pub fn scan<S: AsRef<str>>(install_path: &Utf8Path, known: &[S]) -> Result<RefreshDelta, SError> {
        let entries = match std::fs::read_dir(install_path) {
            Ok(entries) => entries,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
                ) =>
            {
                debug!("Skipping refresh of {install_path}: {e}");
                return Ok(RefreshDelta::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut on_disk = BTreeSet::new();
        let mut added = Vec::new();
        let known: BTreeSet<&str> = known.iter().map(AsRef::as_ref).collect();

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                warn!("Ignoring non UTF-8 directory in {install_path}: {:?}", entry.file_name());
                continue;
            };

            if !known.contains(name.as_str()) {
                let install_time = entry.metadata()?.modified().ok().map(to_unix_timestamp);
                added.push(Self::mod_from_directory(&name, install_time));
            }
            on_disk.insert(name);
        }

        added.sort_by(|a, b| a.id.cmp(&b.id));
        let removed = known
            .into_iter()
            .filter(|id| !on_disk.contains(*id))
            .map(str::to_string)
            .collect();

        Ok(RefreshDelta { added, removed })
    }

    fn mod_from_directory(name: &str, install_time: Option<u64>) -> Mod {
        let mut m = Mod::new(name);
        m.attributes = ModInfo {
            name: Some(name.to_string()),
            install_time,
            ..ModInfo::default()
        };
        m
    }
}
