//! Implementation of the `handoff name` command.

use super::resolve_name;
use crate::cli::NameArgs;
use crate::config::Config;
use crate::error::{HandoffError, Result};
use crate::locks::LockCoordinator;

/// Execute the `handoff name` command.
///
/// Prints the mutex name, or with `--lock-file` the lock file that backs it.
pub fn cmd_name(args: NameArgs, config: &Config) -> Result<()> {
    let name = resolve_name(&args.target, &args.scope, config)?;

    if !args.lock_file {
        println!("{}", name);
        return Ok(());
    }

    let coordinator = LockCoordinator::from_config(config);
    let path = coordinator.lock_path(&name).ok_or_else(|| {
        HandoffError::UserError(format!(
            "'{}' is a local mutex and has no lock file.\n\n\
             Use --global to name a host-wide mutex.",
            name
        ))
    })?;
    println!("{}", path.display());
    Ok(())
}
