use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

macro_rules! define_paths {
    ($name:ident { $($field:ident : $default:expr),* $(,)? }) => {
        #[derive(Clone, Debug)]
        pub struct $name {
            $(pub $field: Utf8PathBuf,)*
        }

        impl $name {
            pub fn to_absolute(mut self, base: &Utf8Path) -> Self {
                $(self.$field = base.join(self.$field);)*
                self
            }

            pub fn new(base: &Utf8Path) -> Self {
                Self::default().to_absolute(base)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($field: $default.into(),)*
                }
            }
        }
    };
}

define_paths!(DataPathRules {
    state: "state.json",
    activation: "activation",
    logs: "logs",
});

const USERDATA: &str = "{USERDATA}";
const GAME: &str = "{GAME}";
const BASE: &str = "{base}";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathKind {
    Base,
    Download,
    Install,
}

/// Per-game storage locations. Values are templates that may reference
/// `{USERDATA}`, `{GAME}` and (except `base`) `{base}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StatePaths {
    pub base: String,
    pub download: String,
    pub install: String,
}

impl Default for StatePaths {
    fn default() -> Self {
        Self {
            base: format!("{USERDATA}/{GAME}"),
            download: format!("{BASE}/downloads"),
            install: format!("{BASE}/mods"),
        }
    }
}

/// Expands the template for `kind` into an absolute path for `game_id`.
pub fn resolve_path(
    kind: PathKind,
    paths: &BTreeMap<String, StatePaths>,
    game_id: &str,
    user_data: &Utf8Path,
) -> Utf8PathBuf {
    let fallback = StatePaths::default();
    let game_paths = paths.get(game_id).unwrap_or(&fallback);

    let expand = |template: &str| {
        template
            .replace(USERDATA, user_data.as_str())
            .replace(GAME, game_id)
    };

    let base = expand(&game_paths.base);
    let resolved = match kind {
        PathKind::Base => base,
        PathKind::Download => expand(&game_paths.download).replace(BASE, &base),
        PathKind::Install => expand(&game_paths.install).replace(BASE, &base),
    };

    Utf8PathBuf::from(resolved)
}
