//! CLI definitions and command dispatch.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::bootstrap;
use crate::chain::{Direction, Target};
use crate::config::{self, ConfigError, Settings};
use crate::engine::{Engine, HistoryEntry, StepReport};
use crate::error::{marker_label, ChainIntegrityError, EngineError, StoreError};
use crate::revisions;
use crate::store::StoreDriver;

/// Schema migrations for the meal-tracking backend
#[derive(Parser, Debug)]
#[command(name = "mealtrack-migrate", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database URL (sqlite::memory:, sqlite://path, postgres://…, mysql://…)
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Name of the single-row table holding the applied revision
    #[arg(long, global = true, env = "MEALTRACK_VERSION_TABLE")]
    pub version_table: Option<String>,

    /// Do not take the advisory lock around mutating commands
    #[arg(long, global = true)]
    pub no_lock: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply revisions up to a target (default: head)
    Upgrade {
        /// head, a revision id, or +N
        #[arg(default_value = "head")]
        target: Target,

        /// Print the SQL instead of running it
        #[arg(long)]
        sql: bool,
    },

    /// Revert revisions down to and including a target
    Downgrade {
        /// base, a revision id, or -N
        #[arg(allow_negative_numbers = true)]
        target: Target,

        /// Print the SQL instead of running it
        #[arg(long)]
        sql: bool,
    },

    /// Set the applied revision without running anything
    Stamp {
        /// head, base, or a revision id
        target: Target,
    },

    /// Show the applied revision
    Current,

    /// List the revision chain, newest first
    History,

    /// Upgrade to head, then start the server even if the upgrade failed
    Bootstrap {
        /// Server command line, after `--`
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}

impl Cli {
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let settings = Settings::new(self.database_url.clone(), self.version_table.clone())?;
        Ok(if self.no_lock {
            settings.without_lock()
        } else {
            settings
        })
    }
}

pub fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    match &cli.command {
        Commands::Bootstrap { command } => Ok(bootstrap::run(cli.settings(), command)),
        command => {
            migrate(cli, command)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn migrate(cli: &Cli, command: &Commands) -> anyhow::Result<()> {
    let settings = cli.settings()?;
    let chain = revisions::chain()?;
    let store = config::open_store(&settings)?;
    let mut engine = Engine::new(&chain, store);

    match command {
        Commands::Upgrade { target, sql: true } => {
            print_sql(Direction::Upgrade, &engine.upgrade_sql(target)?);
        }
        Commands::Upgrade { target, sql: false } => {
            let reports = locked(&mut engine, settings.lock, |e| e.upgrade(target))?;
            summarize(Direction::Upgrade, &reports);
        }
        Commands::Downgrade { target, sql: true } => {
            print_sql(Direction::Downgrade, &engine.downgrade_sql(target)?);
        }
        Commands::Downgrade { target, sql: false } => {
            let reports = locked(&mut engine, settings.lock, |e| e.downgrade(target))?;
            summarize(Direction::Downgrade, &reports);
        }
        Commands::Stamp { target } => {
            locked(&mut engine, settings.lock, |e| e.stamp(target))?;
        }
        Commands::Current => {
            let marker = engine.current()?;
            let head = chain.head().map(|r| r.revision);
            let suffix = match (&marker, head) {
                (Some(m), Some(h)) if m == h => " (head)",
                _ => "",
            };
            println!("{}{}", marker_label(marker.as_deref()), suffix);
        }
        Commands::History => {
            for (i, entry) in engine.history()?.iter().enumerate() {
                println!("{}", history_line(entry, i == 0));
            }
        }
        // dispatched by run
        Commands::Bootstrap { .. } => {}
    }

    Ok(())
}

fn locked<'a, S: StoreDriver, T>(
    engine: &mut Engine<'a, S>,
    lock: bool,
    f: impl FnOnce(&mut Engine<'a, S>) -> Result<T, EngineError>,
) -> Result<T, EngineError> {
    if lock {
        engine.with_lock(f)
    } else {
        f(engine)
    }
}

fn summarize(direction: Direction, reports: &[StepReport]) {
    if reports.is_empty() {
        info!(%direction, "Nothing to do");
        return;
    }
    let skipped: usize = reports.iter().map(StepReport::skipped).sum();
    info!(
        %direction,
        steps = reports.len(),
        skipped_actions = skipped,
        "Finished"
    );
}

fn print_sql(direction: Direction, steps: &[(String, Vec<String>)]) {
    for (revision, statements) in steps {
        println!("-- {} {}", direction, revision);
        for statement in statements {
            let statement = statement.trim_end();
            if statement.ends_with(';') {
                println!("{}", statement);
            } else {
                println!("{};", statement);
            }
        }
        println!();
    }
}

fn history_line(entry: &HistoryEntry, is_head: bool) -> String {
    let mut line = format!(
        "{} -> {}",
        marker_label(entry.down_revision),
        entry.revision
    );
    if is_head {
        line.push_str(" (head)");
    }
    if entry.current {
        line.push_str(" (current)");
    }
    if !entry.applied {
        line.push_str(" (pending)");
    }
    line.push_str(", ");
    line.push_str(entry.message);
    line
}

/// Process exit code for an error returned by [`run`].
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(e) = err.downcast_ref::<EngineError>() {
        e.exit_code()
    } else if let Some(e) = err.downcast_ref::<ConfigError>() {
        e.exit_code()
    } else if err.downcast_ref::<ChainIntegrityError>().is_some() {
        3
    } else if err.downcast_ref::<StoreError>().is_some() {
        2
    } else {
        1
    }
}
