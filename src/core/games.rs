use crate::models::error::SError;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub trait Game: Send + Sync {
    fn id(&self) -> &str;

    /// Absolute deployment target per mod type. The empty mod type is the
    /// game's default directory.
    fn mod_paths(&self, discovery_path: &Utf8Path) -> BTreeMap<String, Utf8PathBuf>;
}

pub trait GameRegistry: Send + Sync {
    fn get_game(&self, game_id: &str) -> Option<Arc<dyn Game>>;
}

/// A game described by configuration rather than code.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GameDefinition {
    pub id: String,
    pub name: String,
    /// Mod type to directory relative to the game's discovery path.
    #[serde(default)]
    pub mod_dirs: BTreeMap<String, Utf8PathBuf>,
}

impl GameDefinition {
    /// A game whose mods all land in the discovered directory itself.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mod_dirs: BTreeMap::from([(String::new(), Utf8PathBuf::new())]),
        }
    }

    pub fn with_mod_dir(mut self, mod_type: impl Into<String>, dir: impl Into<Utf8PathBuf>) -> Self {
        self.mod_dirs.insert(mod_type.into(), dir.into());
        self
    }
}

impl Game for GameDefinition {
    fn id(&self) -> &str {
        &self.id
    }

    fn mod_paths(&self, discovery_path: &Utf8Path) -> BTreeMap<String, Utf8PathBuf> {
        self.mod_dirs
            .iter()
            .map(|(mod_type, dir)| {
                let path = if dir.as_str().is_empty() {
                    discovery_path.to_path_buf()
                } else {
                    discovery_path.join(dir)
                };
                (mod_type.clone(), path)
            })
            .collect()
    }
}

#[derive(Default, Clone)]
pub struct KnownGames {
    games: BTreeMap<String, Arc<dyn Game>>,
}

impl KnownGames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(definitions: &[GameDefinition]) -> Self {
        definitions
            .iter()
            .cloned()
            .fold(Self::new(), |games, def| games.with_game(Arc::new(def)))
    }

    pub fn with_game(mut self, game: Arc<dyn Game>) -> Self {
        self.games.insert(game.id().to_string(), game);
        self
    }
}

impl GameRegistry for KnownGames {
    fn get_game(&self, game_id: &str) -> Option<Arc<dyn Game>> {
        self.games.get(game_id).cloned()
    }
}

/// Looks the game up and maps its mod types onto `discovery_path`.
pub fn mod_paths_for(
    registry: &dyn GameRegistry,
    game_id: &str,
    discovery_path: &Utf8Path,
) -> Result<BTreeMap<String, Utf8PathBuf>, SError> {
    registry
        .get_game(game_id)
        .map(|game| game.mod_paths(discovery_path))
        .ok_or_else(|| SError::UnknownGame(game_id.to_string()))
}
