use crate::core::deployment::{LinkStrategy, SupportQuery};
use crate::core::linker;
use crate::models::manifest::ActivationEntry;
use crate::utils::id::file_checksum;
use camino::Utf8Path;
use std::io;

pub struct HardlinkStrategy;

impl LinkStrategy for HardlinkStrategy {
    fn id(&self) -> &'static str {
        "hardlink"
    }

    fn name(&self) -> &'static str {
        "Hardlink Deployment"
    }

    fn description(&self) -> &'static str {
        "Links staged files into the game directory without copying them. \
         Requires both on the same volume."
    }

    fn is_supported(&self, query: &SupportQuery) -> Option<String> {
        let install_dev = match linker::device_of(query.install_path) {
            Ok(dev) => dev,
            Err(e) => return Some(format!("cannot inspect {}: {e}", query.install_path)),
        };
        let data_dev = match linker::device_of(query.data_path) {
            Ok(dev) => dev,
            Err(e) => return Some(format!("cannot inspect {}: {e}", query.data_path)),
        };

        (install_dev != data_dev).then(|| {
            format!(
                "{} and {} are on different volumes",
                query.install_path, query.data_path
            )
        })
    }

    fn deploy_file(&self, source: &Utf8Path, target: &Utf8Path) -> io::Result<Option<String>> {
        linker::hard_link(source, target).map(|_| None)
    }

    fn is_deployed(&self, source: &Utf8Path, target: &Utf8Path, _: &ActivationEntry) -> bool {
        linker::is_same_file(source, target)
    }

    fn remove_file(
        &self,
        source: &Utf8Path,
        target: &Utf8Path,
        _: &ActivationEntry,
    ) -> io::Result<bool> {
        if !linker::occupied(target) {
            return Ok(true);
        }
        // Without the source there is nothing left to compare against
        if source.exists() && !linker::is_same_file(source, target) {
            return Ok(false);
        }
        linker::remove_target(target)?;
        Ok(true)
    }

    fn sweeps_orphans(&self) -> bool {
        true
    }
}

pub struct SymlinkStrategy;

impl LinkStrategy for SymlinkStrategy {
    fn id(&self) -> &'static str {
        "symlink"
    }

    fn name(&self) -> &'static str {
        "Symlink Deployment"
    }

    fn description(&self) -> &'static str {
        "Places symbolic links to the staged files in the game directory."
    }

    fn is_supported(&self, _: &SupportQuery) -> Option<String> {
        None
    }

    fn deploy_file(&self, source: &Utf8Path, target: &Utf8Path) -> io::Result<Option<String>> {
        linker::symlink(source, target).map(|_| None)
    }

    fn is_deployed(&self, source: &Utf8Path, target: &Utf8Path, _: &ActivationEntry) -> bool {
        linker::read_link_target(target).map_or(false, |t| t.as_path() == source)
    }

    fn remove_file(
        &self,
        _: &Utf8Path,
        target: &Utf8Path,
        _: &ActivationEntry,
    ) -> io::Result<bool> {
        if !linker::occupied(target) {
            return Ok(true);
        }
        linker::unlink(target)
    }

    fn sweeps_orphans(&self) -> bool {
        true
    }
}

pub struct CopyStrategy;

impl LinkStrategy for CopyStrategy {
    fn id(&self) -> &'static str {
        "copy"
    }

    fn name(&self) -> &'static str {
        "Copy Deployment"
    }

    fn description(&self) -> &'static str {
        "Copies staged files into the game directory. Works everywhere but \
         uses additional disk space."
    }

    fn is_supported(&self, _: &SupportQuery) -> Option<String> {
        None
    }

    fn deploy_file(&self, source: &Utf8Path, target: &Utf8Path) -> io::Result<Option<String>> {
        linker::copy(source, target)?;
        file_checksum(target).map(Some)
    }

    fn is_deployed(&self, source: &Utf8Path, target: &Utf8Path, entry: &ActivationEntry) -> bool {
        let Some(recorded) = entry.checksum.as_deref() else {
            return false;
        };
        match (file_checksum(source), file_checksum(target)) {
            (Ok(s), Ok(t)) => s == recorded && t == recorded,
            _ => false,
        }
    }

    fn remove_file(
        &self,
        _: &Utf8Path,
        target: &Utf8Path,
        entry: &ActivationEntry,
    ) -> io::Result<bool> {
        if !linker::occupied(target) {
            return Ok(true);
        }
        if let Some(recorded) = entry.checksum.as_deref() {
            if file_checksum(target)? != recorded {
                return Ok(false);
            }
        }
        linker::remove_target(target)?;
        Ok(true)
    }
}
