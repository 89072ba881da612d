use crate::core::linker;
use crate::models::error::SError;
use camino::{Utf8Path, Utf8PathBuf};
use file_id::FileId;
use std::collections::HashSet;
use tracing::debug;
use walkdir::WalkDir;

/// Removes empty directories from `path`'s parent upwards, stopping at
/// `stop_at` (exclusive) or at the first directory that still has content.
pub fn prune_empty_parents(path: &Utf8Path, stop_at: &Utf8Path) {
    for dir in path.ancestors().skip(1) {
        if dir == stop_at || !dir.starts_with(stop_at) {
            break;
        }
        if !is_dir_empty(dir) || std::fs::remove_dir(dir).is_err() {
            break;
        }
        debug!("Removed empty directory {dir}");
    }
}

/// Scans `data_path` for links that point back into `install_path` and
/// removes them, along with directories the removal left empty.
/// Returns the removed paths.
pub fn sweep_orphans(
    install_path: &Utf8Path,
    data_path: &Utf8Path,
) -> Result<Vec<Utf8PathBuf>, SError> {
    if !data_path.exists() {
        return Ok(Vec::new());
    }

    let managed_ids = build_managed_ids(install_path);
    let mut removed = Vec::new();
    let mut emptied: HashSet<Utf8PathBuf> = HashSet::new();

    let walker = WalkDir::new(data_path)
        .contents_first(true)
        .into_iter()
        .filter_entry(|e| !e.path().starts_with(install_path));

    for entry in walker {
        let entry = entry?;
        let path = Utf8Path::from_path(entry.path())
            .ok_or_else(|| SError::ParseError(format!("Invalid UTF-8 path: {:?}", entry.path())))?;

        if path == data_path {
            continue;
        }

        if process_entry(path, install_path, &managed_ids, &emptied, &entry)? {
            if let Some(parent) = path.parent() {
                emptied.insert(parent.to_path_buf());
            }
            removed.push(path.to_path_buf());
        }
    }

    Ok(removed)
}

/// Returns Ok(true) if the entry was removed.
fn process_entry(
    path: &Utf8Path,
    install_path: &Utf8Path,
    managed_ids: &HashSet<FileId>,
    emptied: &HashSet<Utf8PathBuf>,
    entry: &walkdir::DirEntry,
) -> Result<bool, SError> {
    let file_type = entry.file_type();

    // Symlinks pointing back into the staging area
    if file_type.is_symlink() {
        let Ok(target) = linker::read_link_target(path) else {
            return Ok(false);
        };
        if target.starts_with(install_path) {
            return Ok(linker::unlink(path)?);
        }
        return Ok(false);
    }

    // Hardlinks matched by physical file ID
    if file_type.is_file() {
        let Ok(id) = linker::get_id(path) else {
            return Ok(false);
        };
        if managed_ids.contains(&id) {
            linker::remove_target(path)?;
            return Ok(true);
        }
        return Ok(false);
    }

    // Directories are visited after their content; only those this sweep
    // emptied are removed
    if file_type.is_dir() && emptied.contains(path) && is_dir_empty(path) {
        return Ok(std::fs::remove_dir(path).is_ok());
    }

    Ok(false)
}

fn build_managed_ids(install_path: &Utf8Path) -> HashSet<FileId> {
    WalkDir::new(install_path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| file_id::get_file_id(e.path()).ok())
        .collect()
}

pub fn is_dir_empty(path: &Utf8Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut i| i.next().is_none())
        .unwrap_or(false)
}
