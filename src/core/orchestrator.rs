use crate::core::activation_store::ActivationStore;
use crate::core::deployment::{default_methods, supported_methods, DeploymentMethod};
use crate::core::events::{Event, EventBus};
use crate::core::games::{mod_paths_for, GameRegistry};
use crate::core::install::InstallManager;
use crate::core::notify::{show_error, ErrorOptions, Notifier};
use crate::core::refresh::{ModRefreshScanner, RefreshDelta};
use crate::core::store::{Action, Store};
use crate::models::error::SError;
use crate::models::mod_dto::{Mod, ModId, ModState};
use crate::models::paths::StatePaths;
use crate::models::state::State;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, instrument, warn};

/// Outcome of a full deployment of the active profile.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeploymentReport {
    pub method: String,
    /// Deployed file count per mod type.
    pub deployed: BTreeMap<String, usize>,
}

/// A game ready to deploy into: discovered, known to the registry, with its
/// storage paths resolved.
struct GameTarget {
    install_path: Utf8PathBuf,
    mod_paths: BTreeMap<String, Utf8PathBuf>,
}

/// Sequences refresh, activator selection and deployment cycles in
/// response to lifecycle events. Owns no state of its own; everything is
/// read from and written to the store.
pub struct DeploymentOrchestrator {
    store: Arc<Store>,
    games: Arc<dyn GameRegistry>,
    methods: Vec<Arc<dyn DeploymentMethod>>,
    activations: ActivationStore,
    notifier: Arc<dyn Notifier>,
    events: Arc<EventBus>,
    installer: Option<Arc<dyn InstallManager>>,
}

impl DeploymentOrchestrator {
    pub fn new(
        store: Arc<Store>,
        games: Arc<dyn GameRegistry>,
        activations: ActivationStore,
        notifier: Arc<dyn Notifier>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            games,
            methods: default_methods(),
            activations,
            notifier,
            events,
            installer: None,
        }
    }

    /// Replaces the installed methods. Order is preference order.
    pub fn with_methods(mut self, methods: Vec<Arc<dyn DeploymentMethod>>) -> Self {
        self.methods = methods;
        self
    }

    pub fn with_installer(mut self, installer: Arc<dyn InstallManager>) -> Self {
        self.installer = Some(installer);
        self
    }

    pub fn methods(&self) -> &[Arc<dyn DeploymentMethod>] {
        &self.methods
    }

    /// Subscribes the handlers to the orchestrator's event bus. The bus only
    /// keeps a weak reference.
    pub fn attach(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.events.on(move |event| {
            if let Some(orchestrator) = weak.upgrade() {
                orchestrator.handle_event(event);
            }
        });
    }

    /// Runs the handler for `event` and reports its failure to the user.
    pub fn handle_event(&self, event: &Event) {
        let (title, result) = match event {
            Event::GameModeActivated { game } => {
                ("Failed to activate game", self.on_game_mode_activated(game))
            }
            Event::PathsChanged {
                game,
                previous,
                current,
            } => (
                "Failed to refresh mods",
                self.on_paths_changed(game, previous, current),
            ),
            Event::RemoveMod { game, mod_id } => {
                ("Failed to remove mod", self.on_remove_mod(game, mod_id))
            }
            Event::StartInstallDownload { download_id } => (
                "Failed to install mod",
                self.on_start_install_download(download_id).map(|_| ()),
            ),
            Event::ModsRefreshed { .. } => return,
        };

        if let Err(e) = result {
            error!("{} handler failed: {}", event.name(), e);
            show_error(self.notifier.as_ref(), title, &e);
        }
    }

    // Event handlers

    /// Validates the configured deployment method for the newly active game,
    /// then reconciles its mod catalog with the install directory.
    #[instrument(skip(self))]
    pub fn on_game_mode_activated(&self, game_id: &str) -> Result<(), SError> {
        let activation = self.check_activator(game_id);
        let refresh = self.refresh_mods(game_id).map(|_| ());
        activation.and(refresh)
    }

    #[instrument(skip(self, previous, current))]
    pub fn on_paths_changed(
        &self,
        game_id: &str,
        previous: &StatePaths,
        current: &StatePaths,
    ) -> Result<(), SError> {
        let state = self.store.get_state();
        if state.active_game() != Some(game_id) || previous == current {
            debug!("Paths of the active game unchanged");
            return Ok(());
        }
        self.refresh_mods(game_id).map(|_| ())
    }

    /// Disables and forgets the mod right away, then undeploys it from every
    /// mod-type directory and deletes its staging directory.
    ///
    /// Directory failures do not stop the remaining directories and are not
    /// rolled back. The staging directory is kept if any of them failed.
    #[instrument(skip(self))]
    pub fn on_remove_mod(&self, game_id: &str, mod_id: &str) -> Result<(), SError> {
        let state = self.store.get_state();
        let m = state
            .find_mod(game_id, mod_id)
            .cloned()
            .ok_or_else(|| SError::ModNotFound(mod_id.to_string()))?;

        match state.active_profile(game_id) {
            Some(profile) => self.store.dispatch(Action::SetModEnabled {
                profile: profile.id.clone(),
                mod_id: mod_id.to_string(),
                enabled: false,
            })?,
            None => debug!("No active profile for {game_id}"),
        }
        self.store.dispatch(Action::RemoveMod {
            game: game_id.to_string(),
            mod_id: mod_id.to_string(),
        })?;

        let state = self.store.get_state();
        let Some(target) = self.target_of(&state, game_id)? else {
            info!("{game_id} is not discovered, nothing deployed to clean up");
            return Ok(());
        };
        let method = self.resolve_method(&state, game_id, &target)?;
        let staging = target.install_path.join(&m.installation_path);

        self.for_each_mod_type(&target, |_, data_path| {
            let last = self.activations.load(&state.app.instance_id, data_path)?;
            method.prepare(data_path, false, last)?;
            method.deactivate(&target.install_path, data_path, &m)?;
            let manifest = method.finalize(data_path)?;
            self.activations
                .save(&state.app.instance_id, data_path, &manifest)
        })?;

        match std::fs::remove_dir_all(&staging) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!("Removed {mod_id} from {game_id}");
        Ok(())
    }

    /// Hands the archive of a download to the install manager and returns the
    /// id of the installed mod.
    #[instrument(skip(self))]
    pub fn on_start_install_download(&self, download_id: &str) -> Result<ModId, SError> {
        let installer = self
            .installer
            .as_ref()
            .ok_or_else(|| SError::InstallFailed("no install manager registered".into()))?;

        let state = self.store.get_state();
        let download = state
            .persistent
            .downloads
            .get(download_id)
            .ok_or_else(|| SError::DownloadNotFound(download_id.to_string()))?;
        let archive = state
            .download_path(&download.game)
            .join(&download.local_path);

        installer.install(
            download_id,
            &archive,
            &download.game,
            &download.mod_info,
            true,
            false,
        )
    }

    // Operations

    /// Scans the install directory and applies the delta to the catalog.
    /// Mods still being installed are never pruned.
    pub fn refresh_mods(&self, game_id: &str) -> Result<RefreshDelta, SError> {
        let state = self.store.get_state();
        let install_path = state.install_path(game_id);
        let known: Vec<&str> = state
            .mods_of(game_id)
            .map(|mods| mods.keys().map(String::as_str).collect())
            .unwrap_or_default();

        let mut delta = ModRefreshScanner::scan(&install_path, &known)?;
        delta
            .removed
            .retain(|id| state.find_mod(game_id, id).map(|m| m.state) != Some(ModState::Installing));

        for m in &delta.added {
            self.store.dispatch(Action::AddMod {
                game: game_id.to_string(),
                m: m.clone(),
            })?;
        }
        for mod_id in &delta.removed {
            self.store.dispatch(Action::RemoveMod {
                game: game_id.to_string(),
                mod_id: mod_id.clone(),
            })?;
        }

        info!(
            "Refreshed {}: {} added, {} removed",
            game_id,
            delta.added.len(),
            delta.removed.len()
        );
        self.events.emit(&Event::ModsRefreshed {
            game: game_id.to_string(),
        });
        Ok(delta)
    }

    /// Brings every mod-type directory in line with the active profile.
    #[instrument(skip(self))]
    pub fn deploy_mods(&self, game_id: &str) -> Result<DeploymentReport, SError> {
        let state = self.store.get_state();
        let target = self
            .target_of(&state, game_id)?
            .ok_or_else(|| SError::GameNotDiscovered(game_id.to_string()))?;
        let profile = state
            .active_profile(game_id)
            .ok_or_else(|| SError::NoActiveProfile(game_id.to_string()))?;
        let method = self.resolve_method(&state, game_id, &target)?;
        let default_type = target.mod_paths.keys().next().cloned().unwrap_or_default();

        let mods: Vec<&Mod> = state
            .mods_of(game_id)
            .map(|mods| mods.values().collect())
            .unwrap_or_default();
        let enabled: Vec<&Mod> = mods
            .iter()
            .copied()
            .filter(|m| m.state == ModState::Installed && profile.is_enabled(&m.id))
            .collect();

        let mut report = DeploymentReport {
            method: method.id().to_string(),
            deployed: BTreeMap::new(),
        };

        self.for_each_mod_type(&target, |mod_type, data_path| {
            let of_type = |m: &Mod| {
                let ty = if target.mod_paths.contains_key(&m.mod_type) {
                    &m.mod_type
                } else {
                    &default_type
                };
                ty == mod_type
            };

            let last = self.activations.load(&state.app.instance_id, data_path)?;
            let working = method.prepare(data_path, false, last)?;

            // Owners that should no longer be deployed here
            let mut stale: Vec<&str> = working
                .files
                .values()
                .map(|entry| entry.source.as_str())
                .filter(|owner| !enabled.iter().any(|m| m.id == *owner && of_type(*m)))
                .collect();
            stale.sort_unstable();
            stale.dedup();
            for owner in stale {
                let m = mods
                    .iter()
                    .find(|m| m.id == owner)
                    .map(|m| (*m).clone())
                    .unwrap_or_else(|| Mod::new(owner));
                method.deactivate(&target.install_path, data_path, &m)?;
            }

            for m in enabled.iter().copied() {
                if of_type(m) {
                    method.activate(&target.install_path, data_path, m)?;
                }
            }

            let manifest = method.finalize(data_path)?;
            self.activations
                .save(&state.app.instance_id, data_path, &manifest)?;
            report
                .deployed
                .insert(mod_type.to_string(), manifest.files.len());
            Ok(())
        })?;

        info!("Deployed {game_id} with {}", report.method);
        Ok(report)
    }

    /// Removes everything the resolved method deployed for the game.
    #[instrument(skip(self))]
    pub fn purge_mods(&self, game_id: &str) -> Result<(), SError> {
        let state = self.store.get_state();
        let target = self
            .target_of(&state, game_id)?
            .ok_or_else(|| SError::GameNotDiscovered(game_id.to_string()))?;
        let method = self.resolve_method(&state, game_id, &target)?;
        self.purge_with(&state, method.as_ref(), &target)
    }

    // Helpers

    fn installed_method(&self, id: &str) -> Option<Arc<dyn DeploymentMethod>> {
        self.methods.iter().find(|m| m.id() == id).cloned()
    }

    fn target_of(&self, state: &State, game_id: &str) -> Result<Option<GameTarget>, SError> {
        let Some(discovery) = state.discovery_path(game_id) else {
            return Ok(None);
        };
        Ok(Some(GameTarget {
            install_path: state.install_path(game_id),
            mod_paths: mod_paths_for(self.games.as_ref(), game_id, discovery)?,
        }))
    }

    /// The configured method if it is installed, otherwise the first method
    /// supporting every mod type of the game.
    fn resolve_method(
        &self,
        state: &State,
        game_id: &str,
        target: &GameTarget,
    ) -> Result<Arc<dyn DeploymentMethod>, SError> {
        if let Some(method) = state.activator_for(game_id).and_then(|id| self.installed_method(id)) {
            return Ok(method);
        }
        supported_methods(&self.methods, game_id, &target.install_path, &target.mod_paths)
            .into_iter()
            .next()
            .ok_or_else(|| SError::NoDeploymentMethod(game_id.to_string()))
    }

    fn check_activator(&self, game_id: &str) -> Result<(), SError> {
        let state = self.store.get_state();
        let configured = state.activator_for(game_id);

        // A missing method is reported whether or not the game is discovered
        let old = match configured {
            Some(id) => match self.installed_method(id) {
                Some(method) => Some(method),
                None => {
                    self.notifier.show_error_notification(
                        "Deployment method no longer available",
                        &format!(
                            "The deployment method \"{id}\" used with {game_id} is no \
                             longer available. Files it deployed cannot be cleaned up until \
                             it is restored."
                        ),
                        ErrorOptions {
                            allow_report: false,
                        },
                    );
                    return Ok(());
                }
            },
            None => None,
        };

        let Some(target) = self.target_of(&state, game_id)? else {
            debug!("{game_id} is not discovered, skipping activator check");
            return Ok(());
        };
        let supported =
            supported_methods(&self.methods, game_id, &target.install_path, &target.mod_paths);

        if let Some(old) = old {
            if supported.iter().any(|m| m.id() == old.id()) {
                return Ok(());
            }
            warn!("{} no longer supports {game_id}, purging", old.id());
            self.purge_with(&state, old.as_ref(), &target)?;
        }

        match supported.first() {
            Some(method) => {
                info!("Selecting {} for {game_id}", method.id());
                self.store.dispatch(Action::SetActivator {
                    game: game_id.to_string(),
                    activator: method.id().to_string(),
                })
            }
            None => {
                warn!("No deployment method supports {game_id}");
                Ok(())
            }
        }
    }

    fn purge_with(
        &self,
        state: &State,
        method: &dyn DeploymentMethod,
        target: &GameTarget,
    ) -> Result<(), SError> {
        self.for_each_mod_type(target, |_, data_path| {
            let last = self.activations.load(&state.app.instance_id, data_path)?;
            method.prepare(data_path, false, last)?;
            method.purge(&target.install_path, data_path)?;
            let manifest = method.finalize(data_path)?;
            self.activations
                .save(&state.app.instance_id, data_path, &manifest)
        })
    }

    /// Runs `step` for each mod-type directory in order. A failing directory
    /// is logged and skipped; the first failure is returned at the end.
    fn for_each_mod_type<F>(&self, target: &GameTarget, mut step: F) -> Result<(), SError>
    where
        F: FnMut(&str, &Utf8Path) -> Result<(), SError>,
    {
        let mut first_error = None;
        for (mod_type, data_path) in &target.mod_paths {
            if let Err(e) = step(mod_type, data_path) {
                error!("Mod type \"{mod_type}\" at {data_path} failed: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
