use crate::config::AppSettings;
use crate::core::activation_store::ActivationStore;
use crate::core::events::{Event, EventBus};
use crate::core::games::KnownGames;
use crate::core::notify::TracingNotifier;
use crate::core::orchestrator::DeploymentOrchestrator;
use crate::core::store::{Action, Store};
use crate::core::transfer::{transfer_archives, TransferMode};
use crate::models::error::SError;
use crate::models::mod_dto::Profile;
use crate::models::paths::DataPathRules;
use crate::models::state::AppState;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Record where a game is installed
    Discover { game: String, path: Utf8PathBuf },
    /// Switch the active game, validating its deployment method
    Activate { game: String },
    /// Reconcile the mod catalog of the active game with its install directory
    Refresh,
    /// Enable a mod in the active profile
    Enable { mod_id: String },
    /// Disable a mod in the active profile
    Disable { mod_id: String },
    /// Choose the deployment method for the active game
    SetMethod { id: String },
    /// Deploy the enabled mods of the active profile
    Deploy,
    /// Remove every deployed file of the active game
    Purge,
    /// Undeploy a mod and delete it
    Remove { mod_id: String },
    /// Copy or move archives into a directory, such as a download directory
    Transfer {
        dest: Utf8PathBuf,
        #[arg(required = true)]
        archives: Vec<Utf8PathBuf>,
        #[arg(long)]
        keep_source: bool,
    },
}

/// Everything a command needs, wired from the settings.
pub struct AppContext {
    pub settings: AppSettings,
    pub paths: DataPathRules,
    pub store: Arc<Store>,
    pub events: Arc<EventBus>,
    pub orchestrator: Arc<DeploymentOrchestrator>,
}

impl AppContext {
    pub fn load(settings: AppSettings) -> Result<Self, SError> {
        let paths = DataPathRules::new(&settings.home);
        let store = Arc::new(open_store(&paths, &settings)?);
        let events = Arc::new(EventBus::new());

        let orchestrator = Arc::new(DeploymentOrchestrator::new(
            store.clone(),
            Arc::new(KnownGames::from_definitions(&settings.games)),
            ActivationStore::new(paths.activation.clone()),
            Arc::new(TracingNotifier),
            events.clone(),
        ));
        orchestrator.attach();
        events.on(|event| {
            if let Event::ModsRefreshed { game } = event {
                info!("Mods of {game} refreshed");
            }
        });

        Ok(Self {
            settings,
            paths,
            store,
            events,
            orchestrator,
        })
    }

    pub fn save_state(&self) -> Result<(), SError> {
        self.store.save(&self.paths.state)
    }

    fn active_game(&self) -> Result<String, SError> {
        self.store
            .get_state()
            .active_game()
            .map(str::to_string)
            .ok_or(SError::NoActiveGame)
    }

    fn active_profile_id(&self, game: &str) -> Result<String, SError> {
        self.store
            .get_state()
            .active_profile(game)
            .map(|p| p.id.clone())
            .ok_or_else(|| SError::NoActiveProfile(game.to_string()))
    }

    /// Gives the game a default profile the first time it is activated.
    fn ensure_profile(&self, game: &str) -> Result<(), SError> {
        if self.store.get_state().active_profile(game).is_some() {
            return Ok(());
        }
        let profile = Profile {
            id: uuid::Uuid::new_v4().to_string(),
            game_id: game.to_string(),
            name: "Default".into(),
            mod_state: Default::default(),
        };
        let profile_id = profile.id.clone();
        self.store.dispatch(Action::CreateProfile(profile))?;
        self.store.dispatch(Action::SetLastActiveProfile {
            game: game.to_string(),
            profile: profile_id,
        })
    }
}

/// Restores the snapshot and stamps it with this installation's identity.
fn open_store(paths: &DataPathRules, settings: &AppSettings) -> Result<Store, SError> {
    let store = Store::open(&paths.state)?;
    let current = store.get_state();
    if !current.app.instance_id.is_empty() && current.app.user_data == settings.home {
        return Ok(store);
    }

    let instance_id = if current.app.instance_id.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        current.app.instance_id.clone()
    };
    let mut state = (*current).clone();
    state.app = AppState {
        instance_id,
        user_data: settings.home.clone(),
    };
    Ok(Store::with_default_checks(state))
}

#[instrument(skip(settings))]
pub async fn execute(command: Command, settings: AppSettings) -> Result<(), SError> {
    let concurrency = settings.transfer_concurrency;
    let ctx = Arc::new(AppContext::load(settings)?);

    match command {
        Command::Transfer {
            dest,
            archives,
            keep_source,
        } => {
            let mode = if keep_source {
                TransferMode::Copy
            } else {
                TransferMode::Move
            };
            let failures = transfer_archives(archives, &dest, mode, concurrency).await;
            for failure in &failures {
                eprintln!("{failure}");
            }
            info!("Transfer finished with {} failures", failures.len());
            Ok(())
        }
        command => {
            tokio::task::spawn_blocking(move || {
                let result = run_blocking(&ctx, command);
                // State changes are kept even when the command failed half way
                ctx.save_state().and(result)
            })
            .await
            .map_err(|e| SError::AsyncRuntimeError(e.to_string()))?
        }
    }
}

fn run_blocking(ctx: &AppContext, command: Command) -> Result<(), SError> {
    match command {
        Command::Discover { game, path } => {
            if !ctx.settings.games.iter().any(|g| g.id == game) {
                return Err(SError::UnknownGame(game));
            }
            let path = dunce::canonicalize(&path)
                .map_err(|_| SError::FileOrDirectoryNotFound(path.to_string()))?;
            let path = Utf8PathBuf::try_from(path)?;
            info!("Discovered {game} at {path}");
            ctx.store.dispatch(Action::SetDiscovery {
                game,
                path: Some(path),
            })
        }
        Command::Activate { game } => {
            ctx.store.dispatch(Action::SetActiveGame(Some(game.clone())))?;
            ctx.ensure_profile(&game)?;
            ctx.events.emit(&Event::GameModeActivated { game });
            Ok(())
        }
        Command::Refresh => {
            let game = ctx.active_game()?;
            let delta = ctx.orchestrator.refresh_mods(&game)?;
            if delta.is_empty() {
                println!("Mod catalog of {game} is up to date");
            }
            for m in &delta.added {
                println!("+ {}", m.id);
            }
            for id in &delta.removed {
                println!("- {id}");
            }
            Ok(())
        }
        Command::Enable { mod_id } => set_enabled(ctx, mod_id, true),
        Command::Disable { mod_id } => set_enabled(ctx, mod_id, false),
        Command::SetMethod { id } => {
            let game = ctx.active_game()?;
            if !ctx.orchestrator.methods().iter().any(|m| m.id() == id) {
                return Err(SError::DeploymentMethodUnavailable(id));
            }
            ctx.store.dispatch(Action::SetActivator {
                game,
                activator: id,
            })
        }
        Command::Deploy => {
            let game = ctx.active_game()?;
            let report = ctx.orchestrator.deploy_mods(&game)?;
            for (mod_type, count) in &report.deployed {
                let label = if mod_type.is_empty() { "default" } else { mod_type.as_str() };
                println!("{label}: {count} files ({})", report.method);
            }
            Ok(())
        }
        Command::Purge => {
            let game = ctx.active_game()?;
            ctx.orchestrator.purge_mods(&game)
        }
        Command::Remove { mod_id } => {
            let game = ctx.active_game()?;
            ctx.orchestrator.on_remove_mod(&game, &mod_id)
        }
        Command::Transfer { .. } => Ok(()),
    }
}

fn set_enabled(ctx: &AppContext, mod_id: String, enabled: bool) -> Result<(), SError> {
    let game = ctx.active_game()?;
    if ctx.store.get_state().find_mod(&game, &mod_id).is_none() {
        return Err(SError::ModNotFound(mod_id));
    }
    let profile = ctx.active_profile_id(&game)?;
    ctx.store.dispatch(Action::SetModEnabled {
        profile,
        mod_id,
        enabled,
    })
}
