//! Command implementations for handoff.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the argument helpers they share.

mod demo;
mod hold;
mod lock;
mod name;
mod run;

use crate::cli::{Cli, Command, LockAction, MutexTarget, ScopeArgs};
use crate::config::Config;
use crate::error::Result;
use crate::locks::{self, MutexName};
use std::time::Duration;

/// Dispatch a command to its implementation.
///
/// Loads the configuration once and hands it to the handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::discover(cli.config.as_deref())?;

    match cli.command {
        Command::Name(args) => name::cmd_name(args, &config),
        Command::Run(args) => run::cmd_run(args, &config),
        Command::Hold(args) => hold::cmd_hold(args, &config),
        Command::Lock(lock_cmd) => match lock_cmd.action {
            LockAction::List => lock::cmd_lock_list(&config),
            LockAction::Clear(args) => lock::cmd_lock_clear(args, &config),
        },
        Command::Demo(args) => demo::cmd_demo(args, &config),
    }
}

/// Build the mutex name selected by `--name`/`--path` and the scope flags.
pub(crate) fn resolve_name(
    target: &MutexTarget,
    scope: &ScopeArgs,
    config: &Config,
) -> Result<MutexName> {
    let scope = scope.resolve(config.default_scope);
    match (&target.name, &target.path) {
        (Some(name), _) => locks::name_for(name, scope),
        (None, Some(path)) => locks::name_for_path(path, scope),
        // clap's argument group guarantees one of the two.
        (None, None) => Err(crate::error::HandoffError::UserError(
            "either --name or --path is required".to_string(),
        )),
    }
}

/// The wait a command should allow, from its flag or the config default.
pub(crate) fn resolve_timeout(timeout_ms: Option<u64>, config: &Config) -> Duration {
    timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.default_timeout())
}
