mod common;

use common::{
    stage_mod, CallLog, Fixture, MockInstaller, RecordingMethod, GAME, INSTANCE, PROFILE,
};
use mod_deployer_lib::core::deployment::{CopyStrategy, DeploymentMethod, LinkingDeployment};
use mod_deployer_lib::core::events::Event;
use mod_deployer_lib::core::store::Action;
use mod_deployer_lib::models::error::SError;
use mod_deployer_lib::models::mod_dto::{Download, Mod, ModInfo};
use mod_deployer_lib::models::paths::StatePaths;
use parking_lot::Mutex;
use std::fs;
use std::sync::Arc;

fn copy_method() -> Arc<dyn DeploymentMethod> {
    Arc::new(LinkingDeployment::new(CopyStrategy))
}

fn catalog_ids(fx: &Fixture) -> Vec<String> {
    fx.store
        .get_state()
        .mods_of(GAME)
        .map(|mods| mods.keys().cloned().collect())
        .unwrap_or_default()
}

/// Records dispatched action kinds into `log`, in dispatch order.
fn trace_actions(fx: &Fixture, log: &CallLog, kinds: &[&'static str]) {
    for kind in kinds.iter().copied() {
        let log = log.clone();
        fx.store.register_sanity_check(kind, move |_, action| {
            log.lock().push(format!("store:{}", action.kind()));
            None
        });
    }
}

#[test]
fn test_game_activation_adds_new_mods_to_catalog() {
    let fx = Fixture::new();
    fx.install_mod("m1", &[("a.txt", "a")]);
    stage_mod(&fx.install_path, "m2", &[("b.txt", "b")]);

    let refreshed = Arc::new(Mutex::new(Vec::new()));
    let sink = refreshed.clone();
    fx.events.on(move |event| {
        if let Event::ModsRefreshed { game } = event {
            sink.lock().push(game.clone());
        }
    });

    let orchestrator = fx.orchestrator(vec![copy_method()]);
    orchestrator.on_game_mode_activated(GAME).unwrap();

    assert_eq!(catalog_ids(&fx), vec!["m1", "m2"]);
    assert_eq!(*refreshed.lock(), vec![GAME.to_string()]);
}

#[test]
fn test_refresh_prunes_vanished_mods_but_not_installing_ones() {
    let fx = Fixture::new();
    fx.install_mod("kept", &[("a.txt", "a")]);
    fx.store
        .dispatch(Action::AddMod {
            game: GAME.into(),
            m: Mod::new("vanished"),
        })
        .unwrap();
    let mut installing = Mod::new("installing");
    installing.state = mod_deployer_lib::models::mod_dto::ModState::Installing;
    fx.store
        .dispatch(Action::AddMod {
            game: GAME.into(),
            m: installing,
        })
        .unwrap();

    let orchestrator = fx.orchestrator(vec![copy_method()]);
    let delta = orchestrator.refresh_mods(GAME).unwrap();

    assert_eq!(delta.removed, vec!["vanished".to_string()]);
    assert_eq!(catalog_ids(&fx), vec!["installing", "kept"]);
}

#[test]
fn test_activation_without_configured_method_selects_first_supported() {
    let fx = Fixture::new();
    let log = CallLog::default();
    let unsupported = RecordingMethod::new("fast", false, log.clone());
    let supported = RecordingMethod::new("slow", true, log.clone());

    let orchestrator = fx.orchestrator(vec![unsupported, supported]);
    orchestrator.on_game_mode_activated(GAME).unwrap();

    assert_eq!(fx.store.get_state().activator_for(GAME), Some("slow"));
    assert!(log.lock().is_empty());
}

#[test]
fn test_incompatible_method_is_purged_then_replaced() {
    let fx = Fixture::new();
    let log = CallLog::default();
    let old = RecordingMethod::new("old", false, log.clone());
    let first = RecordingMethod::new("first", true, log.clone());
    let second = RecordingMethod::new("second", true, log.clone());
    fx.set_activator("old");

    let game = fx.game().with_mod_dir("plugins", "Data/Plugins");
    let orchestrator = fx.orchestrator_for(game, vec![old.clone(), first.clone(), second]);
    orchestrator.on_game_mode_activated(GAME).unwrap();

    // 1. Old method purged every mod-type directory
    assert_eq!(
        old.calls(),
        vec!["prepare", "purge", "finalize", "prepare", "purge", "finalize"]
    );
    // 2. First eligible method selected
    assert_eq!(fx.store.get_state().activator_for(GAME), Some("first"));
    assert!(first.calls().is_empty());
    assert!(fx.notifier.titles().is_empty());
}

#[test]
fn test_uninstalled_method_warns_without_purge() {
    let fx = Fixture::new();
    let log = CallLog::default();
    let available = RecordingMethod::new("available", true, log.clone());
    fx.set_activator("removed-extension");
    stage_mod(&fx.install_path, "m1", &[("a.txt", "a")]);

    let orchestrator = fx.orchestrator(vec![available]);
    orchestrator.on_game_mode_activated(GAME).unwrap();

    // 1. Warning, not reportable
    let notifications = fx.notifier.notifications.lock().clone();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Deployment method no longer available");
    assert!(!notifications[0].allow_report);

    // 2. Nothing purged, configuration untouched
    assert!(log.lock().is_empty());
    assert_eq!(
        fx.store.get_state().activator_for(GAME),
        Some("removed-extension")
    );

    // 3. Refresh still ran
    assert_eq!(catalog_ids(&fx), vec!["m1"]);
}

#[test]
fn test_uninstalled_method_warns_on_undiscovered_game() {
    let fx = Fixture::new();
    let available = RecordingMethod::new("available", true, CallLog::default());
    fx.set_activator("removed-extension");
    fx.store
        .dispatch(Action::SetDiscovery {
            game: GAME.into(),
            path: None,
        })
        .unwrap();

    let orchestrator = fx.orchestrator(vec![available]);
    orchestrator.on_game_mode_activated(GAME).unwrap();

    let notifications = fx.notifier.notifications.lock().clone();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Deployment method no longer available");
    assert!(!notifications[0].allow_report);
    assert_eq!(
        fx.store.get_state().activator_for(GAME),
        Some("removed-extension")
    );
}

#[test]
fn test_paths_changed_refreshes_active_game_only() {
    let fx = Fixture::new();
    let orchestrator = fx.orchestrator(vec![copy_method()]);
    let previous = StatePaths::default();
    let current = StatePaths {
        install: "{base}/staging".into(),
        ..StatePaths::default()
    };

    fx.store
        .dispatch(Action::SetModPaths {
            game: GAME.into(),
            paths: current.clone(),
        })
        .unwrap();
    let new_install = fx.store.get_state().install_path(GAME);
    stage_mod(&new_install, "moved", &[("a.txt", "a")]);

    // 1. Other game: ignored
    orchestrator
        .on_paths_changed("other", &previous, &current)
        .unwrap();
    assert!(catalog_ids(&fx).is_empty());

    // 2. Same paths: ignored
    orchestrator
        .on_paths_changed(GAME, &current, &current)
        .unwrap();
    assert!(catalog_ids(&fx).is_empty());

    // 3. Active game with new paths
    orchestrator
        .on_paths_changed(GAME, &previous, &current)
        .unwrap();
    assert_eq!(catalog_ids(&fx), vec!["moved"]);
}

#[test]
fn test_removal_updates_state_before_filesystem() {
    let fx = Fixture::new();
    let log = CallLog::default();
    let method = RecordingMethod::new("rec", true, log.clone());
    fx.install_mod("m1", &[("a.txt", "a")]);
    fx.enable("m1");
    fx.set_activator("rec");
    trace_actions(&fx, &log, &["set-mod-enabled", "remove-mod"]);

    let orchestrator = fx.orchestrator(vec![method]);
    orchestrator.on_remove_mod(GAME, "m1").unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            "store:set-mod-enabled",
            "store:remove-mod",
            "rec:prepare",
            "rec:deactivate m1",
            "rec:finalize",
        ]
    );
    assert!(!fx.install_path.join("m1").exists());
}

#[test]
fn test_remove_deployed_mod_with_copy_strategy() {
    let fx = Fixture::new();
    fx.install_mod("m1", &[("m1.esp", "one"), ("meshes/m1.nif", "mesh")]);
    fx.install_mod("m2", &[("m2.esp", "two")]);
    fx.enable("m1");
    fx.enable("m2");
    fx.set_activator("copy");

    let orchestrator = fx.orchestrator(vec![copy_method()]);

    // 1. Deploy
    let report = orchestrator.deploy_mods(GAME).unwrap();
    assert_eq!(report.method, "copy");
    assert_eq!(report.deployed.get(""), Some(&3));
    assert!(fx.game_dir.join("meshes/m1.nif").exists());

    // 2. Remove
    orchestrator.on_remove_mod(GAME, "m1").unwrap();

    let state = fx.store.get_state();
    let profile = state.persistent.profiles.get(PROFILE).unwrap();
    assert_eq!(profile.mod_state.get("m1").map(|m| m.enabled), Some(false));
    assert!(state.find_mod(GAME, "m1").is_none());

    assert!(!fx.game_dir.join("m1.esp").exists());
    assert!(!fx.game_dir.join("meshes").exists());
    assert!(fx.game_dir.join("m2.esp").exists());

    let manifest = fx.activations().load(INSTANCE, &fx.game_dir).unwrap();
    assert_eq!(manifest.files.len(), 1);
    assert_eq!(manifest.owner_of("m2.esp"), Some("m2"));

    assert!(!fx.install_path.join("m1").exists());
}

#[test]
fn test_remove_unknown_mod_fails_without_state_changes() {
    let fx = Fixture::new();
    let before = fx.store.get_state();

    let orchestrator = fx.orchestrator(vec![copy_method()]);
    let result = orchestrator.on_remove_mod(GAME, "ghost");

    assert!(matches!(result, Err(SError::ModNotFound(_))));
    assert_eq!(fx.store.get_state(), before);
}

#[test]
fn test_remove_from_undiscovered_game_only_updates_catalog() {
    let fx = Fixture::new();
    let log = CallLog::default();
    let method = RecordingMethod::new("rec", true, log.clone());
    fx.install_mod("m1", &[("a.txt", "a")]);
    fx.store
        .dispatch(Action::SetDiscovery {
            game: GAME.into(),
            path: None,
        })
        .unwrap();

    let orchestrator = fx.orchestrator(vec![method]);
    orchestrator.on_remove_mod(GAME, "m1").unwrap();

    assert!(catalog_ids(&fx).is_empty());
    assert!(log.lock().is_empty());
}

#[test]
fn test_remove_catalog_only_mod_still_deactivates() {
    let fx = Fixture::new();
    let log = CallLog::default();
    let method = RecordingMethod::new("rec", true, log.clone());
    fx.store
        .dispatch(Action::AddMod {
            game: GAME.into(),
            m: Mod::new("no-files"),
        })
        .unwrap();

    let orchestrator = fx.orchestrator(vec![method.clone()]);
    orchestrator.on_remove_mod(GAME, "no-files").unwrap();

    assert_eq!(
        method.calls(),
        vec!["prepare", "deactivate no-files", "finalize"]
    );
}

#[test]
fn test_remove_without_staging_cleans_deployed_copies() {
    let fx = Fixture::new();
    fx.install_mod("m1", &[("m1.esp", "one")]);
    fx.enable("m1");
    fx.set_activator("copy");

    let orchestrator = fx.orchestrator(vec![copy_method()]);
    orchestrator.deploy_mods(GAME).unwrap();
    assert!(fx.game_dir.join("m1.esp").exists());

    // 1. Staging directory vanishes behind our back
    fs::remove_dir_all(fx.install_path.join("m1")).unwrap();

    // 2. Removal still undeploys
    orchestrator.on_remove_mod(GAME, "m1").unwrap();

    assert!(!fx.game_dir.join("m1.esp").exists());
    let manifest = fx.activations().load(INSTANCE, &fx.game_dir).unwrap();
    assert!(manifest.files.is_empty());
}

#[test]
fn test_remove_continues_past_failing_mod_type() {
    let fx = Fixture::new();
    fx.install_mod("base", &[("base.esp", "b")]);
    fx.store
        .dispatch(Action::AddMod {
            game: GAME.into(),
            m: Mod::new("plugin").with_type("plugins"),
        })
        .unwrap();
    stage_mod(&fx.install_path, "plugin", &[("p.dll", "p")]);
    fx.enable("base");
    fx.enable("plugin");
    fx.set_activator("copy");

    let game = fx.game().with_mod_dir("plugins", "Plugins");
    let orchestrator = fx.orchestrator_for(game, vec![copy_method()]);
    orchestrator.deploy_mods(GAME).unwrap();
    assert!(fx.game_dir.join("Plugins/p.dll").exists());

    // 1. Root manifest becomes unreadable
    let root_manifest = fx.activations().manifest_path(INSTANCE, &fx.game_dir);
    fs::write(&root_manifest, "this is [not toml").unwrap();

    // 2. Removal reports the failure
    let result = orchestrator.on_remove_mod(GAME, "plugin");
    assert!(matches!(result, Err(SError::ParseError(_))));

    // 3. The other directory was still cleaned, nothing rolled back
    assert!(!fx.game_dir.join("Plugins/p.dll").exists());
    assert!(fx.game_dir.join("base.esp").exists());
    assert!(fx.store.get_state().find_mod(GAME, "plugin").is_none());

    // 4. Staging directory kept for a retry
    assert!(fx.install_path.join("plugin").exists());
}

#[test]
fn test_deploy_follows_profile_and_mod_types() {
    let fx = Fixture::new();
    fx.install_mod("base", &[("base.esp", "b")]);
    fx.store
        .dispatch(Action::AddMod {
            game: GAME.into(),
            m: Mod::new("plugin").with_type("plugins"),
        })
        .unwrap();
    stage_mod(&fx.install_path, "plugin", &[("p.dll", "p")]);
    fx.install_mod("disabled", &[("off.esp", "x")]);
    fx.enable("base");
    fx.enable("plugin");

    let game = fx.game().with_mod_dir("plugins", "Plugins");
    let orchestrator = fx.orchestrator_for(game, vec![copy_method()]);

    // 1. Each mod lands in its mod-type directory
    orchestrator.deploy_mods(GAME).unwrap();
    assert!(fx.game_dir.join("base.esp").exists());
    assert!(fx.game_dir.join("Plugins/p.dll").exists());
    assert!(!fx.game_dir.join("off.esp").exists());
    assert!(!fx.game_dir.join("p.dll").exists());

    // 2. Disabling and redeploying removes the files
    fx.store
        .dispatch(Action::SetModEnabled {
            profile: PROFILE.into(),
            mod_id: "plugin".into(),
            enabled: false,
        })
        .unwrap();
    let report = orchestrator.deploy_mods(GAME).unwrap();

    assert!(!fx.game_dir.join("Plugins/p.dll").exists());
    assert_eq!(report.deployed.get("plugins"), Some(&0));
    assert_eq!(report.deployed.get(""), Some(&1));
}

#[test]
fn test_purge_mods_clears_deployment() {
    let fx = Fixture::new();
    fx.install_mod("m1", &[("m1.esp", "one")]);
    fx.enable("m1");

    let orchestrator = fx.orchestrator(vec![copy_method()]);
    orchestrator.deploy_mods(GAME).unwrap();
    assert!(fx.game_dir.join("m1.esp").exists());

    orchestrator.purge_mods(GAME).unwrap();

    assert!(!fx.game_dir.join("m1.esp").exists());
    assert!(fx
        .activations()
        .load(INSTANCE, &fx.game_dir)
        .unwrap()
        .files.is_empty());
    // Staging is untouched
    assert!(fx.install_path.join("m1/m1.esp").exists());
}

#[test]
fn test_deploy_without_supported_method_fails() {
    let fx = Fixture::new();
    let log = CallLog::default();
    let method = RecordingMethod::new("never", false, log);

    let orchestrator = fx.orchestrator(vec![method]);
    let result = orchestrator.deploy_mods(GAME);

    assert!(matches!(result, Err(SError::NoDeploymentMethod(_))));
}

#[test]
fn test_start_install_download_delegates_to_installer() {
    let fx = Fixture::new();
    let installer = Arc::new(MockInstaller::default());
    fx.store
        .dispatch(Action::AddDownload {
            id: "dl-1".into(),
            download: Download {
                game: GAME.into(),
                local_path: "archive.zip".into(),
                mod_info: ModInfo {
                    name: Some("Cool Mod".into()),
                    ..ModInfo::default()
                },
            },
        })
        .unwrap();

    let orchestrator = Arc::new(
        mod_deployer_lib::core::orchestrator::DeploymentOrchestrator::new(
            fx.store.clone(),
            Arc::new(mod_deployer_lib::core::games::KnownGames::from_definitions(&[fx.game()])),
            fx.activations(),
            fx.notifier.clone(),
            fx.events.clone(),
        )
        .with_installer(installer.clone()),
    );

    let mod_id = orchestrator.on_start_install_download("dl-1").unwrap();
    assert_eq!(mod_id, "dl-1-mod");

    let calls = installer.calls.lock().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].archive_path,
        fx.store.get_state().download_path(GAME).join("archive.zip")
    );
    assert_eq!(calls[0].mod_info.name.as_deref(), Some("Cool Mod"));
    assert!(calls[0].allow_auto_enable);
    assert!(!calls[0].allow_auto_start);

    // Unknown download
    assert!(matches!(
        orchestrator.on_start_install_download("missing"),
        Err(SError::DownloadNotFound(_))
    ));
}

#[test]
fn test_event_bus_routes_failures_to_notifier() {
    let fx = Fixture::new();
    let orchestrator = fx.orchestrator(vec![copy_method()]);
    orchestrator.attach();

    fx.events.emit(&Event::RemoveMod {
        game: GAME.into(),
        mod_id: "ghost".into(),
    });

    let notifications = fx.notifier.notifications.lock().clone();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Failed to remove mod");
    assert!(notifications[0].details.contains("ghost"));
    assert!(!notifications[0].allow_report);
}

#[test]
fn test_event_bus_drives_game_activation() {
    let fx = Fixture::new();
    stage_mod(&fx.install_path, "m1", &[("a.txt", "a")]);
    let orchestrator = fx.orchestrator(vec![copy_method()]);
    orchestrator.attach();

    fx.events.emit(&Event::GameModeActivated { game: GAME.into() });

    assert_eq!(catalog_ids(&fx), vec!["m1"]);
    assert_eq!(fx.store.get_state().activator_for(GAME), Some("copy"));
}

#[test]
fn test_detached_orchestrator_ignores_events() {
    let fx = Fixture::new();
    stage_mod(&fx.install_path, "m1", &[("a.txt", "a")]);
    let orchestrator = fx.orchestrator(vec![copy_method()]);
    orchestrator.attach();
    drop(orchestrator);

    fx.events.emit(&Event::GameModeActivated { game: GAME.into() });

    assert!(catalog_ids(&fx).is_empty());
}

#[test]
fn test_remove_after_redeploy_leaves_unrelated_files() {
    let fx = Fixture::new();
    fx.install_mod("m1", &[("shared.txt", "m1")]);
    fx.enable("m1");
    fs::write(fx.game_dir.join("vanilla.esm"), "base").unwrap();

    let orchestrator = fx.orchestrator(vec![copy_method()]);
    orchestrator.deploy_mods(GAME).unwrap();
    orchestrator.deploy_mods(GAME).unwrap();
    orchestrator.on_remove_mod(GAME, "m1").unwrap();

    assert!(!fx.game_dir.join("shared.txt").exists());
    assert!(fx.game_dir.join("vanilla.esm").exists());
}
