use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type GameId = String;
pub type ModId = String;
pub type ProfileId = String;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ModInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_time: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModState {
    #[default]
    Installed,
    Installing,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Mod {
    pub id: ModId,
    #[serde(default)]
    pub state: ModState,
    /// Staging directory, relative to the game's install path.
    pub installation_path: Utf8PathBuf,
    /// Mod-type directory the mod deploys into. Empty selects the game's
    /// default directory.
    #[serde(default)]
    pub mod_type: String,
    #[serde(default)]
    pub attributes: ModInfo,
}

impl Mod {
    pub fn new(id: impl Into<ModId>) -> Self {
        let id = id.into();
        Self {
            installation_path: Utf8PathBuf::from(&id),
            id,
            state: ModState::Installed,
            mod_type: String::new(),
            attributes: ModInfo::default(),
        }
    }

    pub fn with_type(mut self, mod_type: impl Into<String>) -> Self {
        self.mod_type = mod_type.into();
        self
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProfileMod {
    pub enabled: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Profile {
    pub id: ProfileId,
    pub game_id: GameId,
    pub name: String,
    #[serde(default)]
    pub mod_state: BTreeMap<ModId, ProfileMod>,
}

impl Profile {
    pub fn is_enabled(&self, mod_id: &str) -> bool {
        self.mod_state.get(mod_id).map_or(false, |m| m.enabled)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Download {
    pub game: GameId,
    /// Archive location, relative to the game's download path.
    pub local_path: Utf8PathBuf,
    #[serde(default)]
    pub mod_info: ModInfo,
}
