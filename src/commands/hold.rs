//! Implementation of the `handoff hold` command.
//!
//! Acquires a mutex, reports it on stdout, holds it for `--for-ms`, then
//! releases it. With `--abandon` the process exits while still holding the
//! mutex, which is how a crashed holder looks to everyone else.

use super::{resolve_name, resolve_timeout};
use crate::cli::HoldArgs;
use crate::config::Config;
use crate::error::{HandoffError, Result};
use crate::exit_codes;
use crate::locks::LockCoordinator;
use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

/// Execute the `handoff hold` command.
pub fn cmd_hold(args: HoldArgs, config: &Config) -> Result<()> {
    let name = resolve_name(&args.target, &args.scope, config)?;
    let timeout = resolve_timeout(args.timeout_ms, config);

    let coordinator = LockCoordinator::from_config(config);
    let start = Instant::now();
    let Some(guard) = coordinator.acquire(&name, timeout)? else {
        return Err(HandoffError::LockTimeout {
            name: name.to_string(),
            waited_ms: start.elapsed().as_millis() as u64,
        });
    };

    // Callers wait for this line to know the mutex is held.
    if guard.was_abandoned() {
        println!("acquired {} (abandoned)", name);
    } else {
        println!("acquired {}", name);
    }
    std::io::stdout()
        .flush()
        .map_err(|e| HandoffError::Io(format!("failed to flush stdout: {}", e)))?;

    thread::sleep(Duration::from_millis(args.for_ms));

    if args.abandon {
        tracing::warn!(mutex = %name, "exiting without releasing");
        // process::exit skips destructors, so the guard never releases.
        std::process::exit(exit_codes::SUCCESS);
    }

    guard.release()?;
    println!("released {}", name);
    Ok(())
}
