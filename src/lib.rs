pub mod commands;
pub mod config;
pub mod core;
pub mod logging;
pub mod models;
pub mod utils;

use crate::commands::Cli;
use crate::config::AppSettings;
use crate::models::error::SError;
use crate::models::paths::DataPathRules;
use clap::Parser;
use tracing::info;

pub fn run() -> Result<(), SError> {
    let cli = Cli::parse();
    let settings = AppSettings::load()?;
    let paths = DataPathRules::new(&settings.home);
    let _guard = logging::init(&paths.logs, &settings.log_level)?;
    info!("Data root {}", settings.home);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(commands::execute(cli.command, settings))
}
