use crate::models::mod_dto::{GameId, ModId};
use crate::models::paths::StatePaths;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    GameModeActivated {
        game: GameId,
    },
    /// Mod storage paths of `game` were edited.
    PathsChanged {
        game: GameId,
        previous: StatePaths,
        current: StatePaths,
    },
    RemoveMod {
        game: GameId,
        mod_id: ModId,
    },
    StartInstallDownload {
        download_id: String,
    },
    ModsRefreshed {
        game: GameId,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::GameModeActivated { .. } => "gamemode-activated",
            Event::PathsChanged { .. } => "paths-changed",
            Event::RemoveMod { .. } => "remove-mod",
            Event::StartInstallDownload { .. } => "start-install-download",
            Event::ModsRefreshed { .. } => "mods-refreshed",
        }
    }
}

type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, listener: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Delivers to a snapshot of the listeners, so a listener may emit or
    /// subscribe without deadlocking.
    pub fn emit(&self, event: &Event) {
        let listeners: Vec<Listener> = self.listeners.read().clone();
        for listener in listeners {
            listener(event);
        }
    }
}
