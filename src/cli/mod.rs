//! CLI argument parsing for handoff.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::locks::Scope;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Handoff: named mutexes and owner-thread dispatch for scripts and hosts.
///
/// Global mutexes are shared by every process on the host that uses the
/// same lock directory; local mutexes only by the threads of one process.
#[derive(Parser, Debug)]
#[command(name = "handoff")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a handoff.yaml file (defaults to $HANDOFF_CONFIG, then built-in defaults).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for handoff.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the mutex name for a name or a path.
    ///
    /// Different spellings of the same path print the same name.
    Name(NameArgs),

    /// Run a command while holding a named mutex.
    ///
    /// Waits up to the timeout for the mutex; the command is not started
    /// if the mutex stays busy.
    Run(RunArgs),

    /// Acquire a named mutex and hold it for a while.
    ///
    /// Useful for testing other processes against a busy or abandoned lock.
    Hold(HoldArgs),

    /// Inspect and clear global lock files.
    Lock(LockCommand),

    /// Run background producers against an owner-thread dispatcher.
    Demo(DemoArgs),
}

/// Which mutex a command works on.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct MutexTarget {
    /// An explicit mutex name (without the `Global/` or `Local/` prefix).
    #[arg(long)]
    pub name: Option<String>,

    /// A file or directory whose location identifies the mutex.
    #[arg(long)]
    pub path: Option<PathBuf>,
}

/// Scope selection; the config's `default_scope` applies when neither is set.
#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Use a host-wide mutex.
    #[arg(long, conflicts_with = "local")]
    pub global: bool,

    /// Use a process-local mutex.
    #[arg(long)]
    pub local: bool,
}

impl ScopeArgs {
    pub fn resolve(&self, default: Scope) -> Scope {
        if self.global {
            Scope::Global
        } else if self.local {
            Scope::Local
        } else {
            default
        }
    }
}

/// Arguments for the `name` command.
#[derive(Args, Debug)]
pub struct NameArgs {
    #[command(flatten)]
    pub target: MutexTarget,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Print the backing lock file path instead of the name.
    #[arg(long)]
    pub lock_file: bool,
}

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub target: MutexTarget,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// How long to wait for the mutex (defaults to the config's default_timeout_ms).
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Command to run. A single argument is split like a shell would.
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        required = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

/// Arguments for the `hold` command.
#[derive(Args, Debug)]
pub struct HoldArgs {
    #[command(flatten)]
    pub target: MutexTarget,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// How long to wait for the mutex (defaults to the config's default_timeout_ms).
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// How long to hold the mutex once acquired.
    #[arg(long, default_value_t = 1000)]
    pub for_ms: u64,

    /// Exit without releasing, leaving the mutex abandoned.
    #[arg(long)]
    pub abandon: bool,
}

/// Lock subcommands.
#[derive(Args, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Lock management actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// List held and abandoned global locks.
    List,

    /// Remove the files of a global lock nobody holds.
    ///
    /// Requires --force.
    Clear(LockClearArgs),
}

/// Arguments for the `lock clear` command.
#[derive(Args, Debug)]
pub struct LockClearArgs {
    /// Fully qualified mutex name, e.g. `Global/build`.
    pub name: String,

    /// Confirm the clear.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `demo` command.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Number of background producer threads.
    #[arg(long, default_value_t = 4)]
    pub producers: usize,

    /// Tasks each producer enqueues.
    #[arg(long, default_value_t = 25)]
    pub tasks: usize,

    /// Owner loop tick in milliseconds.
    #[arg(long, default_value_t = 10)]
    pub tick_ms: u64,

    /// Most tasks run per tick (0 = no limit).
    #[arg(long, default_value_t = 0)]
    pub batch: usize,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
