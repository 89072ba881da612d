use camino::{Utf8Path, Utf8PathBuf};
use file_id::FileId;
use std::fs;
use std::io;

fn ensure_parent(target: &Utf8Path) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn hard_link(source: &Utf8Path, target: &Utf8Path) -> io::Result<()> {
    ensure_parent(target)?;
    fs::hard_link(source, target)
}

pub fn symlink(source: &Utf8Path, target: &Utf8Path) -> io::Result<()> {
    ensure_parent(target)?;

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(source, target)
    }
    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_file(source, target)
    }
}

pub fn copy(source: &Utf8Path, target: &Utf8Path) -> io::Result<()> {
    ensure_parent(target)?;
    fs::copy(source, target).map(|_| ())
}

/// True when something (including a dangling symlink) occupies `path`.
pub fn occupied(path: &Utf8Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Removes whatever file or link sits at `target`. Missing targets are fine.
pub fn remove_target(target: &Utf8Path) -> io::Result<()> {
    match fs::remove_file(target) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Removes `target` only if it is a symlink. Returns whether it was removed.
pub fn unlink(target: &Utf8Path) -> io::Result<bool> {
    let meta = match fs::symlink_metadata(target) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    if !meta.file_type().is_symlink() {
        return Ok(false);
    }

    fs::remove_file(target)?;
    Ok(true)
}

pub fn read_link_target(path: &Utf8Path) -> io::Result<Utf8PathBuf> {
    let target = fs::read_link(path)?;
    Utf8PathBuf::from_path_buf(target)
        .map_err(|p| io::Error::new(io::ErrorKind::InvalidData, format!("{:?}", p)))
}

pub fn get_id(path: &Utf8Path) -> io::Result<FileId> {
    file_id::get_file_id(path)
}

pub fn is_same_file(a: &Utf8Path, b: &Utf8Path) -> bool {
    match (get_id(a), get_id(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Identifies the volume `path` lives on. Walks up to the nearest existing
/// ancestor so it also works for directories that are not created yet.
pub fn device_of(path: &Utf8Path) -> io::Result<u64> {
    let existing = path
        .ancestors()
        .find(|p| !p.as_str().is_empty() && p.exists())
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))?;

    Ok(match get_id(existing)? {
        FileId::Inode { device_id, .. } => device_id,
        FileId::LowRes {
            volume_serial_number,
            ..
        } => volume_serial_number as u64,
        FileId::HighRes {
            volume_serial_number,
            ..
        } => volume_serial_number,
    })
}
