pub mod strategies;

use crate::core::cleanup;
use crate::core::linker;
use crate::models::error::SError;
use crate::models::manifest::{manifest_key, ActivationEntry, ActivationManifest};
use crate::models::mod_dto::Mod;
use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

pub use strategies::{CopyStrategy, HardlinkStrategy, SymlinkStrategy};

/// What a deployment method is asked to support: deploying one mod type of
/// one game from `install_path` into `data_path`.
#[derive(Clone, Copy, Debug)]
pub struct SupportQuery<'a> {
    pub game_id: &'a str,
    pub mod_type: &'a str,
    pub install_path: &'a Utf8Path,
    pub data_path: &'a Utf8Path,
}

/// A technique for making staged mod files visible in a game directory.
///
/// Between `prepare` and `finalize` the method holds a working manifest for
/// the data path; `activate`, `deactivate` and `purge` edit that working copy.
pub trait DeploymentMethod: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// `None` if supported, otherwise the reason it is not.
    fn is_supported(&self, query: &SupportQuery) -> Option<String>;

    /// Opens a working copy of `last`, or an empty one when `clean` is set.
    fn prepare(
        &self,
        data_path: &Utf8Path,
        clean: bool,
        last: ActivationManifest,
    ) -> Result<ActivationManifest, SError>;

    fn activate(&self, install_path: &Utf8Path, data_path: &Utf8Path, m: &Mod)
        -> Result<(), SError>;

    fn deactivate(
        &self,
        install_path: &Utf8Path,
        data_path: &Utf8Path,
        m: &Mod,
    ) -> Result<(), SError>;

    /// Closes the working copy and returns it as the new durable manifest.
    fn finalize(&self, data_path: &Utf8Path) -> Result<ActivationManifest, SError>;

    /// Removes every deployed file of the working manifest.
    fn purge(&self, install_path: &Utf8Path, data_path: &Utf8Path) -> Result<(), SError>;
}

/// Checks every mod type of a game and returns the first reason a method
/// cannot handle it.
pub fn all_types_supported(
    method: &dyn DeploymentMethod,
    game_id: &str,
    install_path: &Utf8Path,
    mod_paths: &BTreeMap<String, Utf8PathBuf>,
) -> Option<String> {
    mod_paths.iter().find_map(|(mod_type, data_path)| {
        method.is_supported(&SupportQuery {
            game_id,
            mod_type,
            install_path,
            data_path,
        })
    })
}

/// The methods able to deploy every mod type of a game, in preference order.
pub fn supported_methods(
    methods: &[Arc<dyn DeploymentMethod>],
    game_id: &str,
    install_path: &Utf8Path,
    mod_paths: &BTreeMap<String, Utf8PathBuf>,
) -> Vec<Arc<dyn DeploymentMethod>> {
    methods
        .iter()
        .filter(|m| {
            match all_types_supported(m.as_ref(), game_id, install_path, mod_paths) {
                None => true,
                Some(reason) => {
                    debug!("{} unsupported for {}: {}", m.id(), game_id, reason);
                    false
                }
            }
        })
        .cloned()
        .collect()
}

/// The file-level mechanism behind a [`LinkingDeployment`].
pub trait LinkStrategy: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;

    fn is_supported(&self, query: &SupportQuery) -> Option<String>;

    /// Places `source` at `target` and returns a checksum to record, if the
    /// strategy tracks one.
    fn deploy_file(&self, source: &Utf8Path, target: &Utf8Path) -> io::Result<Option<String>>;

    /// Whether `target` is still the deployment of `source` described by `entry`.
    fn is_deployed(&self, source: &Utf8Path, target: &Utf8Path, entry: &ActivationEntry) -> bool;

    /// Undoes a deployment. Returns false when the target was left in place
    /// because it no longer looks like ours.
    fn remove_file(
        &self,
        source: &Utf8Path,
        target: &Utf8Path,
        entry: &ActivationEntry,
    ) -> io::Result<bool>;

    /// Whether purge should also sweep links the manifest does not know about.
    fn sweeps_orphans(&self) -> bool {
        false
    }
}

#[derive(Default)]
struct WorkingSet {
    manifest: ActivationManifest,
    /// Records dropped by a clean prepare. Their files are still on disk and
    /// may be reclaimed by activation.
    discarded: BTreeMap<String, ActivationEntry>,
}

pub struct LinkingDeployment<S: LinkStrategy> {
    strategy: S,
    working: Mutex<HashMap<Utf8PathBuf, WorkingSet>>,
}

impl<S: LinkStrategy> LinkingDeployment<S> {
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            working: Mutex::new(HashMap::new()),
        }
    }

    fn with_working<R>(
        &self,
        data_path: &Utf8Path,
        f: impl FnOnce(&mut WorkingSet) -> Result<R, SError>,
    ) -> Result<R, SError> {
        let mut guard = self.working.lock();
        let working = guard
            .get_mut(data_path)
            .ok_or_else(|| SError::NotPrepared(data_path.to_string()))?;
        f(working)
    }

    fn collect_files(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, SError> {
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter(|e| e.as_ref().map_or(true, |e| !e.file_type().is_dir()))
            .map(|e| -> Result<Utf8PathBuf, SError> {
                let e = e?;
                let path = Utf8Path::from_path(e.path()).ok_or_else(|| {
                    SError::ParseError(format!("Invalid UTF-8 path: {:?}", e.path()))
                })?;
                Ok(path.strip_prefix(root)?.to_path_buf())
            })
            .collect()
    }

    fn remove_entry(
        &self,
        source_root: &Utf8Path,
        data_path: &Utf8Path,
        key: &str,
        entry: &ActivationEntry,
    ) -> Result<(), SError> {
        let target = data_path.join(key);
        let source = source_root.join(key);

        if !self.strategy.remove_file(&source, &target, entry)? {
            warn!("{target} changed since it was deployed, leaving it in place");
        }
        cleanup::prune_empty_parents(&target, data_path);
        Ok(())
    }
}

impl<S: LinkStrategy> DeploymentMethod for LinkingDeployment<S> {
    fn id(&self) -> &str {
        self.strategy.id()
    }

    fn name(&self) -> &str {
        self.strategy.name()
    }

    fn description(&self) -> &str {
        self.strategy.description()
    }

    fn is_supported(&self, query: &SupportQuery) -> Option<String> {
        self.strategy.is_supported(query)
    }

    fn prepare(
        &self,
        data_path: &Utf8Path,
        clean: bool,
        last: ActivationManifest,
    ) -> Result<ActivationManifest, SError> {
        let set = if clean {
            WorkingSet {
                manifest: ActivationManifest::default(),
                discarded: last.files,
            }
        } else {
            WorkingSet {
                manifest: last,
                discarded: BTreeMap::new(),
            }
        };

        let working = set.manifest.clone();
        self.working.lock().insert(data_path.to_path_buf(), set);
        Ok(working)
    }

    fn activate(
        &self,
        install_path: &Utf8Path,
        data_path: &Utf8Path,
        m: &Mod,
    ) -> Result<(), SError> {
        let source_root = install_path.join(&m.installation_path);
        if !source_root.is_dir() {
            return Err(SError::FileOrDirectoryNotFound(source_root.to_string()));
        }
        let files = Self::collect_files(&source_root)?;

        self.with_working(data_path, |set| {
            let working = &mut set.manifest;
            for rel in &files {
                let key = manifest_key(rel);
                let source = source_root.join(rel);
                let target = data_path.join(rel);

                match working.files.get(&key) {
                    Some(entry)
                        if entry.source == m.id
                            && self.strategy.is_deployed(&source, &target, entry) =>
                    {
                        continue;
                    }
                    Some(entry) => {
                        if entry.source != m.id {
                            debug!("{} overrides {} for {}", m.id, entry.source, key);
                        }
                        linker::remove_target(&target)?;
                    }
                    None => {
                        if set.discarded.remove(&key).is_some() {
                            linker::remove_target(&target)?;
                        } else if linker::occupied(&target) {
                            warn!("{target} is not managed by deployment, skipping");
                            continue;
                        }
                    }
                }

                let checksum = self.strategy.deploy_file(&source, &target)?;
                working.files.insert(
                    key,
                    ActivationEntry {
                        source: m.id.clone(),
                        checksum,
                    },
                );
            }
            Ok(())
        })
    }

    fn deactivate(
        &self,
        install_path: &Utf8Path,
        data_path: &Utf8Path,
        m: &Mod,
    ) -> Result<(), SError> {
        let source_root = install_path.join(&m.installation_path);

        self.with_working(data_path, |set| {
            let working = &mut set.manifest;
            for key in working.files_owned_by(&m.id) {
                if let Some(entry) = working.files.get(&key).cloned() {
                    self.remove_entry(&source_root, data_path, &key, &entry)?;
                    working.files.remove(&key);
                }
            }
            Ok(())
        })
    }

    fn finalize(&self, data_path: &Utf8Path) -> Result<ActivationManifest, SError> {
        self.working
            .lock()
            .remove(data_path)
            .map(|set| set.manifest)
            .ok_or_else(|| SError::NotPrepared(data_path.to_string()))
    }

    fn purge(&self, install_path: &Utf8Path, data_path: &Utf8Path) -> Result<(), SError> {
        self.with_working(data_path, |set| {
            let mut entries = std::mem::take(&mut set.discarded);
            entries.extend(set.manifest.files.clone());

            // Purge has no catalog; staging directories are named by mod id
            for (key, entry) in entries {
                let source_root = install_path.join(&entry.source);
                self.remove_entry(&source_root, data_path, &key, &entry)?;
                set.manifest.files.remove(&key);
            }
            Ok(())
        })?;

        if self.strategy.sweeps_orphans() {
            let swept = cleanup::sweep_orphans(install_path, data_path)?;
            if !swept.is_empty() {
                debug!("Swept {} orphaned links from {}", swept.len(), data_path);
            }
        }
        Ok(())
    }
}

/// Every built-in method, in preference order.
pub fn default_methods() -> Vec<Arc<dyn DeploymentMethod>> {
    vec![
        Arc::new(LinkingDeployment::new(HardlinkStrategy)),
        Arc::new(LinkingDeployment::new(SymlinkStrategy)),
        Arc::new(LinkingDeployment::new(CopyStrategy)),
    ]
}
