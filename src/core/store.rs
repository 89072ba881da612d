use crate::models::error::SError;
use crate::models::mod_dto::{Download, GameId, Mod, ModId, Profile, ProfileId, ProfileMod};
use crate::models::paths::StatePaths;
use crate::models::state::{DiscoveryResult, State};
use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    SetActiveGame(Option<GameId>),
    SetDiscovery {
        game: GameId,
        path: Option<Utf8PathBuf>,
    },
    SetModPaths {
        game: GameId,
        paths: StatePaths,
    },
    SetActivator {
        game: GameId,
        activator: String,
    },
    AddMod {
        game: GameId,
        m: Mod,
    },
    RemoveMod {
        game: GameId,
        mod_id: ModId,
    },
    CreateProfile(Profile),
    SetLastActiveProfile {
        game: GameId,
        profile: ProfileId,
    },
    SetModEnabled {
        profile: ProfileId,
        mod_id: ModId,
        enabled: bool,
    },
    AddDownload {
        id: String,
        download: Download,
    },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::SetActiveGame(_) => "set-active-game",
            Action::SetDiscovery { .. } => "set-discovery",
            Action::SetModPaths { .. } => "set-mod-paths",
            Action::SetActivator { .. } => "set-activator",
            Action::AddMod { .. } => "add-mod",
            Action::RemoveMod { .. } => "remove-mod",
            Action::CreateProfile(_) => "create-profile",
            Action::SetLastActiveProfile { .. } => "set-last-active-profile",
            Action::SetModEnabled { .. } => "set-mod-enabled",
            Action::AddDownload { .. } => "add-download",
        }
    }
}

/// Applies `action` to a copy of `state`.
pub fn reduce(state: &State, action: &Action) -> State {
    let mut next = state.clone();
    match action {
        Action::SetActiveGame(game) => {
            next.settings.game_mode.active = game.clone();
        }
        Action::SetDiscovery { game, path } => {
            next.settings
                .game_mode
                .discovered
                .insert(game.clone(), DiscoveryResult { path: path.clone() });
        }
        Action::SetModPaths { game, paths } => {
            next.settings.mods.paths.insert(game.clone(), paths.clone());
        }
        Action::SetActivator { game, activator } => {
            next.settings
                .mods
                .activator
                .insert(game.clone(), activator.clone());
        }
        Action::AddMod { game, m } => {
            next.persistent
                .mods
                .entry(game.clone())
                .or_default()
                .insert(m.id.clone(), m.clone());
        }
        Action::RemoveMod { game, mod_id } => {
            if let Some(mods) = next.persistent.mods.get_mut(game) {
                mods.remove(mod_id);
            }
        }
        Action::CreateProfile(profile) => {
            next.persistent
                .profiles
                .insert(profile.id.clone(), profile.clone());
        }
        Action::SetLastActiveProfile { game, profile } => {
            next.settings
                .profiles
                .last_active_profile
                .insert(game.clone(), profile.clone());
        }
        Action::SetModEnabled {
            profile,
            mod_id,
            enabled,
        } => {
            if let Some(p) = next.persistent.profiles.get_mut(profile) {
                p.mod_state
                    .insert(mod_id.clone(), ProfileMod { enabled: *enabled });
            }
        }
        Action::AddDownload { id, download } => {
            next.persistent
                .downloads
                .insert(id.clone(), download.clone());
        }
    }
    next
}

/// Returns a reason to reject the action, or `None` to let it through.
pub type SanityCheck = Box<dyn Fn(&State, &Action) -> Option<String> + Send + Sync>;

/// Single source of truth for catalog, profile and settings state.
///
/// Readers get an immutable snapshot; every dispatch swaps in a new one.
pub struct Store {
    state: RwLock<Arc<State>>,
    checks: RwLock<HashMap<&'static str, Vec<SanityCheck>>>,
}

impl Store {
    pub fn new(initial: State) -> Self {
        Self {
            state: RwLock::new(Arc::new(initial)),
            checks: RwLock::new(HashMap::new()),
        }
    }

    /// A store with the built-in sanity checks registered.
    pub fn with_default_checks(initial: State) -> Self {
        let store = Self::new(initial);

        store.register_sanity_check("set-mod-enabled", |state, action| match action {
            Action::SetModEnabled { profile, .. }
                if !state.persistent.profiles.contains_key(profile) =>
            {
                Some(format!("unknown profile \"{profile}\""))
            }
            _ => None,
        });
        store.register_sanity_check("add-mod", |_, action| match action {
            Action::AddMod { m, .. } if m.id.is_empty() => Some("mod id is empty".into()),
            _ => None,
        });
        store.register_sanity_check("set-activator", |_, action| match action {
            Action::SetActivator { activator, .. } if activator.is_empty() => {
                Some("activator id is empty".into())
            }
            _ => None,
        });

        store
    }

    pub fn get_state(&self) -> Arc<State> {
        self.state.read().clone()
    }

    pub fn register_sanity_check<F>(&self, kind: &'static str, check: F)
    where
        F: Fn(&State, &Action) -> Option<String> + Send + Sync + 'static,
    {
        self.checks
            .write()
            .entry(kind)
            .or_default()
            .push(Box::new(check));
    }

    /// Runs the sanity checks for the action, then replaces the state with
    /// the reduced copy. A rejected action leaves the state untouched.
    pub fn dispatch(&self, action: Action) -> Result<(), SError> {
        let mut guard = self.state.write();
        let current: &State = &guard;

        if let Some(checks) = self.checks.read().get(action.kind()) {
            if let Some(reason) = checks.iter().find_map(|check| check(current, &action)) {
                warn!("Rejected {}: {}", action.kind(), reason);
                return Err(SError::InvalidAction {
                    action: action.kind().to_string(),
                    reason,
                });
            }
        }

        debug!("Dispatch {}", action.kind());
        let next = reduce(current, &action);
        *guard = Arc::new(next);
        Ok(())
    }

    /// Restores a snapshot written by [`Store::save`]. A missing file starts
    /// from the default state.
    pub fn open(path: &Utf8Path) -> Result<Self, SError> {
        let state = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            State::default()
        };
        Ok(Self::with_default_checks(state))
    }

    /// Writes the current snapshot through a sibling temp file.
    pub fn save(&self, path: &Utf8Path) -> Result<(), SError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let snapshot = self.get_state();
        let content = serde_json::to_string_pretty(snapshot.as_ref())?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
