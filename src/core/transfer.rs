use crate::models::error::SError;
use camino::{Utf8Path, Utf8PathBuf};
use std::io;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferMode {
    /// Keep the source.
    Copy,
    Move,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    /// Relative to the source root.
    pub source: Utf8PathBuf,
    /// Relative to the destination root.
    pub destination: Utf8PathBuf,
}

/// Copies or moves archives into `dest_dir`, keeping their file names.
///
/// Every item is attempted. Failures come back as `"<archive> - <message>"`.
pub async fn transfer_archives(
    archives: Vec<Utf8PathBuf>,
    dest_dir: &Utf8Path,
    mode: TransferMode,
    concurrency: usize,
) -> Vec<String> {
    let jobs = archives
        .into_iter()
        .map(|archive| {
            let label = archive.to_string();
            let dest = match archive.file_name() {
                Some(name) => Ok(dest_dir.join(name)),
                None => Err(SError::FileOrDirectoryNotFound(label.clone())),
            };
            (label, archive, dest)
        })
        .collect();

    run_bounded(jobs, mode, concurrency).await
}

/// Transfers the files of an unpacked mod from `source_root` to `dest_root`.
pub async fn transfer_unpacked_mod(
    entries: Vec<FileEntry>,
    source_root: &Utf8Path,
    dest_root: &Utf8Path,
    mode: TransferMode,
    concurrency: usize,
) -> Vec<String> {
    let jobs = entries
        .into_iter()
        .map(|entry| {
            (
                entry.source.to_string(),
                source_root.join(&entry.source),
                Ok(dest_root.join(&entry.destination)),
            )
        })
        .collect();

    run_bounded(jobs, mode, concurrency).await
}

type Job = (String, Utf8PathBuf, Result<Utf8PathBuf, SError>);

async fn run_bounded(jobs: Vec<Job>, mode: TransferMode, concurrency: usize) -> Vec<String> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();
    let mut failures = Vec::new();

    for (label, source, dest) in jobs {
        let dest = match dest {
            Ok(dest) => dest,
            Err(e) => {
                failures.push(format!("{label} - {e}"));
                continue;
            }
        };
        let semaphore = semaphore.clone();

        set.spawn(async move {
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => {
                    tokio::task::spawn_blocking(move || transfer_file(&source, &dest, mode))
                        .await
                        .map_err(|e| SError::AsyncRuntimeError(e.to_string()))
                        .and_then(|r| r)
                }
                Err(e) => Err(SError::AsyncRuntimeError(e.to_string())),
            };
            result.map_err(|e| format!("{label} - {e}"))
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(failure)) => {
                warn!("Transfer failed: {failure}");
                failures.push(failure);
            }
            Err(e) => failures.push(format!("transfer task - {e}")),
        }
    }

    failures.sort();
    failures
}

fn transfer_file(source: &Utf8Path, dest: &Utf8Path, mode: TransferMode) -> Result<(), SError> {
    if !source.is_file() {
        return Err(SError::FileOrDirectoryNotFound(source.to_string()));
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match mode {
        TransferMode::Copy => {
            std::fs::copy(source, dest)?;
        }
        TransferMode::Move => move_file(source, dest)?,
    }
    debug!("Transferred {source} to {dest}");
    Ok(())
}

fn move_file(source: &Utf8Path, dest: &Utf8Path) -> io::Result<()> {
    if std::fs::rename(source, dest).is_ok() {
        return Ok(());
    }
    // Crossing volumes
    std::fs::copy(source, dest)?;
    std::fs::remove_file(source)
}
