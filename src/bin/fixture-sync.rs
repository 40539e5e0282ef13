//! Fixture synchronization CLI
//!
//! Runs synchronizations against the configured database and inspects what
//! they left behind. Every command prints JSON on stdout.

use clap::{Parser, Subcommand};
use fixture_sync::model::{NewTeam, RunStatus, TeamId};
use fixture_sync::sync::latest_logs;
use fixture_sync::{
    maintenance, Caller, HttpRenderer, PageOptions, Result, SqliteStore, Store, SyncConfig,
    Synchronizer, Trigger,
};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "fixture-sync")]
#[command(about = "Synchronize club fixtures and standings from a competition website", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize every team, or one team
    Sync {
        /// Only synchronize this team
        #[arg(long)]
        team: Option<i64>,
        /// Run as the scheduled job, authenticating with this secret
        #[arg(long, conflicts_with = "team")]
        bearer: Option<String>,
    },
    /// Team management commands
    Teams {
        #[command(subcommand)]
        action: TeamCommands,
    },
    /// Show the synchronization log, newest first
    Logs {
        #[arg(long)]
        team: Option<i64>,
        /// Maximum number of entries
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Delete malformed and duplicate fixtures of a team
    Purge {
        #[arg(long)]
        team: i64,
        /// Only report what would be deleted
        #[arg(long)]
        dry_run: bool,
    },
    /// Show a team's stored standings
    Standings {
        #[arg(long)]
        team: i64,
    },
}

#[derive(Subcommand)]
enum TeamCommands {
    /// Register a team
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        category: String,
        /// Competition page to synchronize from
        #[arg(long)]
        source_url: Option<String>,
        /// Other spellings used by the competition site (repeatable)
        #[arg(long = "alias")]
        aliases: Vec<String>,
    },
    /// List registered teams
    List,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match SyncConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            std::process::exit(1);
        }
    };

    match run(cli.command, config).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let json = std::env::var("FIXTURE_SYNC_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");
    // Logs go to stderr; stdout carries the JSON output.
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Returns `Ok(false)` when the command ran but the synchronization failed.
async fn run(command: Commands, config: SyncConfig) -> Result<bool> {
    let mut store = SqliteStore::open(&config.database)?;
    match command {
        Commands::Sync { team, bearer } => {
            let renderer = HttpRenderer::new(PageOptions::from(&config))?;
            let mut trigger = Trigger::new(Synchronizer::new(renderer, store), config.cron_secret)
                .with_run_budget(config.run_budget);
            match team {
                Some(team) => {
                    let summary = trigger.sync_team(&Caller::Admin, TeamId(team)).await?;
                    print_json(&summary)?;
                    Ok(true)
                }
                None => {
                    let caller = bearer.map_or(Caller::Admin, Caller::Bearer);
                    let report = trigger.sync_all(&caller).await?;
                    print_json(&report)?;
                    Ok(report.status != RunStatus::Failed)
                }
            }
        }
        Commands::Teams { action } => match action {
            TeamCommands::Add {
                name,
                category,
                source_url,
                aliases,
            } => {
                let team = store.insert_team(&NewTeam {
                    name,
                    category,
                    aliases,
                    source_url,
                })?;
                print_json(&team)?;
                Ok(true)
            }
            TeamCommands::List => {
                print_json(&store.teams()?)?;
                Ok(true)
            }
        },
        Commands::Logs { team, limit } => {
            let logs = store.sync_logs(team.map(TeamId))?;
            print_json(&latest_logs(logs, limit))?;
            Ok(true)
        }
        Commands::Purge { team, dry_run } => {
            let report = maintenance::purge(&mut store, TeamId(team), dry_run)?;
            print_json(&report)?;
            Ok(true)
        }
        Commands::Standings { team } => {
            let team = store.team(TeamId(team))?;
            print_json(&store.standings_for_team(team.id)?)?;
            Ok(true)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
