//! `grantstate` server binary
//!
//! ```text
//! grantstate [--config PATH] [--bind ADDR] [--write-default-config PATH]
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use grantstate_server::{telemetry, AppState, ServerConfig, CONFIG_FILE_NAME};
use tracing::info;

fn cli() -> Command {
    Command::new("grantstate")
        .about("Versioned grant application state store")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("PATH")
                .help("Config file (default: ./grantstate.toml if present)"),
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .value_name("ADDR")
                .help("Listen address, overrides config and GRANTSTATE_BIND"),
        )
        .arg(
            Arg::new("write-default-config")
                .long("write-default-config")
                .value_name("PATH")
                .action(ArgAction::Set)
                .help("Write a commented default config to PATH and exit"),
        )
}

fn load_config(explicit: Option<&String>) -> anyhow::Result<ServerConfig> {
    let mut config = match explicit {
        Some(path) => ServerConfig::from_file(Path::new(path))?,
        None if Path::new(CONFIG_FILE_NAME).exists() => {
            ServerConfig::from_file(Path::new(CONFIG_FILE_NAME))?
        }
        None => ServerConfig::default(),
    };
    config.apply_env(|name| std::env::var(name).ok())?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    if let Some(path) = matches.get_one::<String>("write-default-config") {
        let path = PathBuf::from(path);
        if ServerConfig::write_default_if_missing(&path)? {
            println!("wrote {}", path.display());
        } else {
            println!("{} already exists, left unchanged", path.display());
        }
        return Ok(());
    }

    telemetry::init();

    let mut config = load_config(matches.get_one::<String>("config"))?;
    if let Some(bind) = matches.get_one::<String>("bind") {
        config.bind = bind.clone();
        config.validate()?;
    }

    let repo = config
        .repository_builder()?
        .build()
        .context("failed to open state storage")?;
    info!(
        target: "grantstate::repo",
        backend = repo.backend_name(),
        keys = repo.stats().keys,
        records = repo.stats().records,
        "Storage opened"
    );

    let state = AppState::new(Arc::new(repo), &config)?;
    grantstate_server::serve(&config, state).await
}
