//! Maintenance CLI over a local Duet database.
//!
//! # Responsibility
//! - Open the database named by the config file and run one command.
//! - Keep output deterministic JSON or `key=value` lines.

use anyhow::{bail, Context};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use duet_core::service::data_service::export_file_name_at;
use duet_core::{
    core_version, export_all, init_logging_from_config, open_db, ping, wipe_all, ActivityService,
    AppConfig, PreferencesStore, SqliteDocumentStore,
};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(name = "duet")]
struct Cli {
    /// TOML config file; built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check core linkage.
    Ping,
    /// Print the merged preferences document.
    Prefs,
    /// Print the active days of one month.
    Activity {
        #[arg(long)]
        year: i32,
        /// 1 = January.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },
    /// Write every data collection to a JSON file.
    Export {
        /// Output file; defaults to a dated name in the current directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete every diary, memory, letter, mood and reminder record.
    Wipe {
        /// Required confirmation.
        #[arg(long)]
        yes: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

fn open_store(config: &AppConfig) -> anyhow::Result<Arc<SqliteDocumentStore>> {
    let conn = open_db(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path.display()))?;
    Ok(Arc::new(SqliteDocumentStore::new(conn)))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ping => {
            println!("duet_core ping={}", ping());
            println!("duet_core version={}", core_version());
            Ok(())
        }
        command => run(command, load_config(cli.config.as_ref())?),
    }
}

fn run(command: Commands, config: AppConfig) -> anyhow::Result<()> {
    init_logging_from_config(&config).map_err(anyhow::Error::msg)?;
    let store = open_store(&config)?;
    info!("event=cli_start module=cli status=ok");

    match command {
        Commands::Ping => {}
        Commands::Prefs => {
            let prefs = PreferencesStore::open(store.clone());
            let current = prefs.read();
            prefs.close();
            println!("{}", serde_json::to_string_pretty(&current)?);
        }
        Commands::Activity { year, month } => {
            let activity = ActivityService::new(store.clone(), config.activity.clone());
            let map = activity.month_in(&Local, year, month - 1)?;
            println!("{}", serde_json::to_string_pretty(map.as_map())?);
        }
        Commands::Export { out } => {
            let export = export_all(store.as_ref())?;
            let path = out.unwrap_or_else(|| {
                PathBuf::from(export_file_name_at(&Utc::now()))
            });
            std::fs::write(&path, serde_json::to_vec_pretty(&export)?)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("export={}", path.display());
        }
        Commands::Wipe { yes } => {
            if !yes {
                bail!("refusing to wipe without --yes");
            }
            for report in wipe_all(store.as_ref(), config.batch_chunk_size)? {
                println!(
                    "collection={} deleted={} batches={}",
                    report.collection,
                    report.deleted(),
                    report.batches.len()
                );
            }
        }
    }
    Ok(())
}
