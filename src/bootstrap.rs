//! Deployment bootstrap: bring the schema to head, then hand over to the
//! server process.
//!
//! A failed upgrade is logged and the server starts anyway, so a bad
//! revision degrades the deployment instead of keeping it down. The exit
//! code is the server's.

use std::process::{Command, ExitCode, ExitStatus};

use anyhow::Context;
use tracing::{error, info};

use crate::chain::Target;
use crate::config::{self, ConfigError, Settings};
use crate::engine::{Engine, StepReport};
use crate::revisions;

pub fn run(settings: Result<Settings, ConfigError>, command: &[String]) -> ExitCode {
    let upgraded = settings
        .map_err(anyhow::Error::from)
        .and_then(|settings| upgrade_head(&settings));

    match upgraded {
        Ok(reports) => info!(steps = reports.len(), "Schema is at head"),
        Err(e) => error!(error = %format!("{:#}", e), "Schema upgrade failed; starting server anyway"),
    }

    match serve(command) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %format!("{:#}", e), "Server failed to start");
            ExitCode::FAILURE
        }
    }
}

pub fn upgrade_head(settings: &Settings) -> anyhow::Result<Vec<StepReport>> {
    let chain = revisions::chain()?;
    let store = config::open_store(settings)?;
    let mut engine = Engine::new(&chain, store);

    let reports = if settings.lock {
        engine.with_lock(|e| e.upgrade(&Target::Head))?
    } else {
        engine.upgrade(&Target::Head)?
    };
    Ok(reports)
}

/// Run the server command to completion and return its exit code.
pub fn serve(command: &[String]) -> anyhow::Result<u8> {
    let (program, args) = command
        .split_first()
        .context("no server command given")?;

    info!(command = %command.join(" "), "Starting server");
    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("spawn {}", program))?;

    Ok(status_code(status))
}

fn status_code(status: ExitStatus) -> u8 {
    match status.code() {
        Some(code) => u8::try_from(code).unwrap_or(1),
        None => signal_code(status),
    }
}

#[cfg(unix)]
fn signal_code(status: ExitStatus) -> u8 {
    use std::os::unix::process::ExitStatusExt;

    status
        .signal()
        .and_then(|signal| u8::try_from(128 + signal).ok())
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn signal_code(_status: ExitStatus) -> u8 {
    1
}
