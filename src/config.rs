use crate::core::games::GameDefinition;
use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "mod-deployer";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AppSettings {
    pub version: u8,
    /// Data root holding the state snapshot, manifests and logs. Also what
    /// `{USERDATA}` expands to.
    pub home: Utf8PathBuf,
    pub log_level: String,
    pub transfer_concurrency: usize,
    #[serde(default)]
    pub games: Vec<GameDefinition>,
}

impl Default for AppSettings {
    fn default() -> Self {
        let base_dir = ProjectDirs::from("com", "martes", APP_NAME)
            .map(|dirs| dirs.data_dir().to_path_buf())
            .or_else(|| {
                std::env::current_exe()
                    .ok()
                    .and_then(|exe_path| exe_path.parent().map(|p| p.to_path_buf()))
            })
            .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
            .unwrap_or_else(|| Utf8PathBuf::from("."));

        Self {
            version: 1,
            home: base_dir,
            log_level: "info".into(),
            transfer_concurrency: 4,
            games: Vec::new(),
        }
    }
}

impl AppSettings {
    pub fn load() -> Result<AppSettings, confy::ConfyError> {
        confy::load(APP_NAME, None)
    }
}
