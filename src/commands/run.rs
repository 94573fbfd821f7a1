//! Implementation of the `handoff run` command.
//!
//! Runs a child command while holding a named mutex:
//! 1. Wait up to the timeout for the mutex
//! 2. Spawn the command and wait for it
//! 3. Release the mutex and report the child's status

use super::{resolve_name, resolve_timeout};
use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::{HandoffError, Result};
use crate::locks::LockCoordinator;
use std::process::{Command, ExitStatus};
use std::time::Instant;

/// Execute the `handoff run` command.
pub fn cmd_run(args: RunArgs, config: &Config) -> Result<()> {
    let name = resolve_name(&args.target, &args.scope, config)?;
    let timeout = resolve_timeout(args.timeout_ms, config);
    let argv = command_line(&args.command)?;

    let coordinator = LockCoordinator::from_config(config);
    let start = Instant::now();
    let Some(guard) = coordinator.acquire(&name, timeout)? else {
        return Err(HandoffError::LockTimeout {
            name: name.to_string(),
            waited_ms: start.elapsed().as_millis() as u64,
        });
    };

    if guard.was_abandoned() {
        eprintln!(
            "Warning: '{}' was abandoned by its previous holder; state it protects may be inconsistent.",
            name
        );
    }

    let (program, rest) = argv
        .split_first()
        .ok_or_else(|| HandoffError::UserError("no command given".to_string()))?;
    tracing::info!(mutex = %name, command = %program, "running command under lock");

    let status = Command::new(program)
        .args(rest)
        .status()
        .map_err(|e| HandoffError::UserError(format!("failed to start '{}': {}", program, e)));

    let released = guard.release();
    child_outcome(program, status, released)
}

/// Combine the child's result with the lock release.
///
/// The child's failure is what the caller asked about, so it wins over a
/// release error, which is then only logged.
fn child_outcome(
    program: &str,
    status: Result<ExitStatus>,
    released: Result<()>,
) -> Result<()> {
    let outcome = status.and_then(|status| {
        if status.success() {
            Ok(())
        } else {
            Err(HandoffError::WorkFailed(match status.code() {
                Some(code) => format!("'{}' exited with status {}", program, code),
                None => format!("'{}' was terminated by a signal", program),
            }))
        }
    });

    match (outcome, released) {
        (Ok(()), released) => released,
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(release_err)) => {
            tracing::warn!(error = %release_err, "failed to release lock after command");
            Err(e)
        }
    }
}

/// Turn the trailing arguments into an argv.
///
/// A single argument is split with shell quoting rules, so both
/// `run -- make -j4` and `run -- "make -j4"` work.
fn command_line(raw: &[String]) -> Result<Vec<String>> {
    let argv = match raw {
        [single] => shell_words::split(single).map_err(|e| {
            HandoffError::UserError(format!("failed to parse command '{}': {}", single, e))
        })?,
        _ => raw.to_vec(),
    };

    if argv.is_empty() {
        return Err(HandoffError::UserError("no command given".to_string()));
    }
    Ok(argv)
}
