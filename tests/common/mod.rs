#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use mod_deployer_lib::core::activation_store::ActivationStore;
use mod_deployer_lib::core::deployment::{DeploymentMethod, SupportQuery};
use mod_deployer_lib::core::events::EventBus;
use mod_deployer_lib::core::games::{GameDefinition, KnownGames};
use mod_deployer_lib::core::install::InstallManager;
use mod_deployer_lib::core::notify::{ErrorOptions, Notifier};
use mod_deployer_lib::core::orchestrator::DeploymentOrchestrator;
use mod_deployer_lib::core::store::{Action, Store};
use mod_deployer_lib::models::error::SError;
use mod_deployer_lib::models::manifest::{ActivationEntry, ActivationManifest};
use mod_deployer_lib::models::mod_dto::{Mod, ModId, ModInfo, Profile};
use mod_deployer_lib::models::state::{AppState, State};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

pub const GAME: &str = "skyrim";
pub const PROFILE: &str = "profile-1";
pub const INSTANCE: &str = "instance-1";

pub fn utf8_tempdir() -> (TempDir, Utf8PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
    (tmp, root)
}

pub fn write_file(path: &Utf8Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Creates a staging directory `<install>/<id>` holding `files`.
pub fn stage_mod(install_path: &Utf8Path, id: &str, files: &[(&str, &str)]) {
    let dir = install_path.join(id);
    fs::create_dir_all(&dir).unwrap();
    for (rel, content) in files {
        write_file(&dir.join(rel), content);
    }
}

/// A discovered, active game with one active profile.
pub struct Fixture {
    pub _tmp: TempDir,
    pub root: Utf8PathBuf,
    pub game_dir: Utf8PathBuf,
    pub install_path: Utf8PathBuf,
    pub activation_root: Utf8PathBuf,
    pub store: Arc<Store>,
    pub events: Arc<EventBus>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Fixture {
    pub fn new() -> Self {
        let (tmp, root) = utf8_tempdir();
        let user_data = root.join("userdata");
        let game_dir = root.join("game");
        fs::create_dir_all(&game_dir).unwrap();

        let state = State {
            app: AppState {
                instance_id: INSTANCE.into(),
                user_data: user_data.clone(),
            },
            ..State::default()
        };
        let store = Arc::new(Store::with_default_checks(state));

        store
            .dispatch(Action::SetDiscovery {
                game: GAME.into(),
                path: Some(game_dir.clone()),
            })
            .unwrap();
        store
            .dispatch(Action::SetActiveGame(Some(GAME.into())))
            .unwrap();
        store
            .dispatch(Action::CreateProfile(Profile {
                id: PROFILE.into(),
                game_id: GAME.into(),
                name: "Default".into(),
                mod_state: BTreeMap::new(),
            }))
            .unwrap();
        store
            .dispatch(Action::SetLastActiveProfile {
                game: GAME.into(),
                profile: PROFILE.into(),
            })
            .unwrap();

        let install_path = store.get_state().install_path(GAME);
        fs::create_dir_all(&install_path).unwrap();

        Self {
            _tmp: tmp,
            activation_root: root.join("activation"),
            root,
            game_dir,
            install_path,
            store,
            events: Arc::new(EventBus::new()),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    pub fn game(&self) -> GameDefinition {
        GameDefinition::new(GAME, "Skyrim")
    }

    pub fn activations(&self) -> ActivationStore {
        ActivationStore::new(self.activation_root.clone())
    }

    pub fn orchestrator_for(
        &self,
        game: GameDefinition,
        methods: Vec<Arc<dyn DeploymentMethod>>,
    ) -> Arc<DeploymentOrchestrator> {
        Arc::new(
            DeploymentOrchestrator::new(
                self.store.clone(),
                Arc::new(KnownGames::from_definitions(&[game])),
                self.activations(),
                self.notifier.clone(),
                self.events.clone(),
            )
            .with_methods(methods),
        )
    }

    pub fn orchestrator(&self, methods: Vec<Arc<dyn DeploymentMethod>>) -> Arc<DeploymentOrchestrator> {
        self.orchestrator_for(self.game(), methods)
    }

    /// Adds a catalog entry and stages its files.
    pub fn install_mod(&self, id: &str, files: &[(&str, &str)]) {
        stage_mod(&self.install_path, id, files);
        self.store
            .dispatch(Action::AddMod {
                game: GAME.into(),
                m: Mod::new(id),
            })
            .unwrap();
    }

    pub fn enable(&self, id: &str) {
        self.store
            .dispatch(Action::SetModEnabled {
                profile: PROFILE.into(),
                mod_id: id.into(),
                enabled: true,
            })
            .unwrap();
    }

    pub fn set_activator(&self, id: &str) {
        self.store
            .dispatch(Action::SetActivator {
                game: GAME.into(),
                activator: id.into(),
            })
            .unwrap();
    }
}

/// Shared, ordered record of calls across collaborators.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// A deployment method that only records what it is asked to do.
pub struct RecordingMethod {
    pub id: String,
    pub supported: bool,
    pub log: CallLog,
    working: Mutex<HashMap<Utf8PathBuf, ActivationManifest>>,
}

impl RecordingMethod {
    pub fn new(id: &str, supported: bool, log: CallLog) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            supported,
            log,
            working: Mutex::new(HashMap::new()),
        })
    }

    fn record(&self, call: String) {
        self.log.lock().push(format!("{}:{}", self.id, call));
    }

    pub fn calls(&self) -> Vec<String> {
        let prefix = format!("{}:", self.id);
        self.log
            .lock()
            .iter()
            .filter_map(|c| c.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }
}

impl DeploymentMethod for RecordingMethod {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "records calls"
    }

    fn is_supported(&self, _: &SupportQuery) -> Option<String> {
        (!self.supported).then(|| "unsupported in tests".to_string())
    }

    fn prepare(
        &self,
        data_path: &Utf8Path,
        clean: bool,
        last: ActivationManifest,
    ) -> Result<ActivationManifest, SError> {
        self.record("prepare".into());
        let manifest = if clean { ActivationManifest::default() } else { last };
        self.working
            .lock()
            .insert(data_path.to_path_buf(), manifest.clone());
        Ok(manifest)
    }

    fn activate(&self, _: &Utf8Path, data_path: &Utf8Path, m: &Mod) -> Result<(), SError> {
        self.record(format!("activate {}", m.id));
        let mut working = self.working.lock();
        let manifest = working
            .get_mut(data_path)
            .ok_or_else(|| SError::NotPrepared(data_path.to_string()))?;
        manifest.files.insert(
            format!("{}.txt", m.id),
            ActivationEntry {
                source: m.id.clone(),
                checksum: None,
            },
        );
        Ok(())
    }

    fn deactivate(&self, _: &Utf8Path, data_path: &Utf8Path, m: &Mod) -> Result<(), SError> {
        self.record(format!("deactivate {}", m.id));
        let mut working = self.working.lock();
        let manifest = working
            .get_mut(data_path)
            .ok_or_else(|| SError::NotPrepared(data_path.to_string()))?;
        manifest.files.retain(|_, e| e.source != m.id);
        Ok(())
    }

    fn finalize(&self, data_path: &Utf8Path) -> Result<ActivationManifest, SError> {
        self.record("finalize".into());
        self.working
            .lock()
            .remove(data_path)
            .ok_or_else(|| SError::NotPrepared(data_path.to_string()))
    }

    fn purge(&self, _: &Utf8Path, data_path: &Utf8Path) -> Result<(), SError> {
        self.record("purge".into());
        if let Some(manifest) = self.working.lock().get_mut(data_path) {
            manifest.files.clear();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub details: String,
    pub allow_report: bool,
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.notifications
            .lock()
            .iter()
            .map(|n| n.title.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn show_error_notification(&self, title: &str, details: &str, options: ErrorOptions) {
        self.notifications.lock().push(Notification {
            title: title.into(),
            details: details.into(),
            allow_report: options.allow_report,
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstallCall {
    pub download_id: String,
    pub archive_path: Utf8PathBuf,
    pub game_id: String,
    pub mod_info: ModInfo,
    pub allow_auto_enable: bool,
    pub allow_auto_start: bool,
}

#[derive(Default)]
pub struct MockInstaller {
    pub calls: Mutex<Vec<InstallCall>>,
}

impl InstallManager for MockInstaller {
    fn install(
        &self,
        download_id: &str,
        archive_path: &Utf8Path,
        game_id: &str,
        mod_info: &ModInfo,
        allow_auto_enable: bool,
        allow_auto_start: bool,
    ) -> Result<ModId, SError> {
        self.calls.lock().push(InstallCall {
            download_id: download_id.into(),
            archive_path: archive_path.to_path_buf(),
            game_id: game_id.into(),
            mod_info: mod_info.clone(),
            allow_auto_enable,
            allow_auto_start,
        });
        Ok(format!("{download_id}-mod"))
    }
}
