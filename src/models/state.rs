use crate::models::mod_dto::{Download, GameId, Mod, ModId, Profile, ProfileId};
use crate::models::paths::{resolve_path, PathKind, StatePaths};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct State {
    #[serde(default)]
    pub app: AppState,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub persistent: Persistent,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct AppState {
    pub instance_id: String,
    /// Expansion of `{USERDATA}` in mod storage paths.
    pub user_data: Utf8PathBuf,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DiscoveryResult {
    pub path: Option<Utf8PathBuf>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub game_mode: GameModeSettings,
    #[serde(default)]
    pub mods: ModSettings,
    #[serde(default)]
    pub profiles: ProfileSettings,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct GameModeSettings {
    pub active: Option<GameId>,
    #[serde(default)]
    pub discovered: BTreeMap<GameId, DiscoveryResult>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ModSettings {
    #[serde(default)]
    pub paths: BTreeMap<GameId, StatePaths>,
    /// Configured deployment method per game.
    #[serde(default)]
    pub activator: BTreeMap<GameId, String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ProfileSettings {
    #[serde(default)]
    pub last_active_profile: BTreeMap<GameId, ProfileId>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Persistent {
    #[serde(default)]
    pub mods: BTreeMap<GameId, BTreeMap<ModId, Mod>>,
    #[serde(default)]
    pub profiles: BTreeMap<ProfileId, Profile>,
    #[serde(default)]
    pub downloads: BTreeMap<String, Download>,
}

// Selectors

impl State {
    pub fn active_game(&self) -> Option<&str> {
        self.settings.game_mode.active.as_deref()
    }

    pub fn discovery_path(&self, game_id: &str) -> Option<&Utf8Path> {
        self.settings
            .game_mode
            .discovered
            .get(game_id)
            .and_then(|d| d.path.as_deref())
    }

    pub fn activator_for(&self, game_id: &str) -> Option<&str> {
        self.settings.mods.activator.get(game_id).map(String::as_str)
    }

    pub fn install_path(&self, game_id: &str) -> Utf8PathBuf {
        resolve_path(
            PathKind::Install,
            &self.settings.mods.paths,
            game_id,
            &self.app.user_data,
        )
    }

    pub fn download_path(&self, game_id: &str) -> Utf8PathBuf {
        resolve_path(
            PathKind::Download,
            &self.settings.mods.paths,
            game_id,
            &self.app.user_data,
        )
    }

    pub fn mods_of(&self, game_id: &str) -> Option<&BTreeMap<ModId, Mod>> {
        self.persistent.mods.get(game_id)
    }

    pub fn find_mod(&self, game_id: &str, mod_id: &str) -> Option<&Mod> {
        self.mods_of(game_id).and_then(|mods| mods.get(mod_id))
    }

    pub fn active_profile(&self, game_id: &str) -> Option<&Profile> {
        self.settings
            .profiles
            .last_active_profile
            .get(game_id)
            .and_then(|id| self.persistent.profiles.get(id))
    }
}
