//! Implementation of the `handoff lock` subcommands.

use crate::cli::LockClearArgs;
use crate::config::Config;
use crate::error::{HandoffError, Result};
use crate::locks::{self, LockState, MutexName};

/// Execute `handoff lock list`.
pub fn cmd_lock_list(config: &Config) -> Result<()> {
    let locks = locks::list_locks(&config.lock_dir, config.lock_stale_minutes)?;

    if locks.is_empty() {
        println!("No active locks.");
        return Ok(());
    }

    println!("Active locks ({}):", locks.len());
    println!();

    for lock in &locks {
        println!("  {} [{}]", lock.name, lock.state.as_str());
        if let Some(meta) = &lock.metadata {
            println!("    Owner:      {}", meta.owner);
            if let Some(pid) = meta.pid {
                let alive = match lock.holder_alive {
                    Some(true) => " (running)",
                    Some(false) => " (exited)",
                    None => "",
                };
                println!("    PID:        {}{}", pid, alive);
            }
            if let Some(thread) = &meta.thread {
                println!("    Thread:     {}", thread);
            }
            println!(
                "    Acquired:   {}",
                meta.acquired_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("    Age:        {}", meta.age_string());
        }
        if lock.is_stale {
            println!(
                "    Status:     STALE (exceeds {} min threshold)",
                config.lock_stale_minutes
            );
        }
        println!("    Path:       {}", lock.path.display());
        println!();
    }

    let abandoned = locks
        .iter()
        .filter(|l| l.state == LockState::Abandoned)
        .count();
    if abandoned > 0 {
        println!(
            "Note: {} lock(s) were abandoned. The next holder takes them over; \
             use `handoff lock clear <name> --force` to remove them now.",
            abandoned
        );
    }

    Ok(())
}

/// Execute `handoff lock clear`.
pub fn cmd_lock_clear(args: LockClearArgs, config: &Config) -> Result<()> {
    if !args.force {
        return Err(HandoffError::UserError(format!(
            "refusing to clear lock without --force flag.\n\n\
             Only clear locks whose holder has exited.\n\n\
             To clear the lock, run:\n  handoff lock clear {} --force",
            args.name
        )));
    }

    let name: MutexName = args.name.parse()?;
    let cleared = locks::clear_lock(&config.lock_dir, &name, config.lock_stale_minutes)?;

    tracing::info!(mutex = %cleared.name, path = %cleared.path.display(), "cleared lock");
    println!("Cleared lock: {}", cleared.name);
    Ok(())
}
