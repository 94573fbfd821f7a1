//! Mutex names: scope prefixes, explicit names and path-derived names.
//!
//! A name renders as `<Scope>/<payload>`, e.g. `Global/build-cache` or
//! `Local/3f1c...`. Path-derived payloads are the hex SHA-256 of the absolute,
//! lexically normalized path.

use crate::error::{HandoffError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

/// Prefix of global mutex names.
pub const GLOBAL_PREFIX: &str = "Global/";

/// Prefix of local mutex names.
pub const LOCAL_PREFIX: &str = "Local/";

/// Payloads that can be used verbatim as a lock file stem.
static FILE_SAFE_PAYLOAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,127}$").expect("static regex is valid")
});

/// Visibility of a named mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Visible to every process on the host that shares the lock directory.
    #[default]
    Global,
    /// Visible only within the current process.
    Local,
}

impl Scope {
    /// The textual prefix, including the trailing `/`.
    pub fn prefix(&self) -> &'static str {
        match self {
            Scope::Global => GLOBAL_PREFIX,
            Scope::Local => LOCAL_PREFIX,
        }
    }
}

/// A validated mutex identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MutexName {
    scope: Scope,
    payload: String,
}

impl MutexName {
    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// File name of the lock file backing this name in a lock directory.
    ///
    /// Payloads that are not plain file stems are replaced by their digest,
    /// prefixed with `~` so they never collide with a verbatim stem.
    pub fn lock_file_name(&self) -> String {
        if FILE_SAFE_PAYLOAD.is_match(&self.payload) {
            format!("{}.lock", self.payload)
        } else {
            format!("~{}.lock", digest_hex(self.payload.as_bytes()))
        }
    }
}

impl fmt::Display for MutexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.scope.prefix(), self.payload)
    }
}

impl FromStr for MutexName {
    type Err = HandoffError;

    /// Parse a fully qualified name such as `Local/file-A`.
    fn from_str(s: &str) -> Result<Self> {
        let (scope, payload) = if let Some(rest) = s.strip_prefix(GLOBAL_PREFIX) {
            (Scope::Global, rest)
        } else if let Some(rest) = s.strip_prefix(LOCAL_PREFIX) {
            (Scope::Local, rest)
        } else {
            return Err(HandoffError::UserError(format!(
                "mutex name '{}' must start with '{}' or '{}'",
                s, GLOBAL_PREFIX, LOCAL_PREFIX
            )));
        };
        name_for(payload, scope)
    }
}

/// Build a mutex name from a caller-supplied name.
pub fn name_for(name: &str, scope: Scope) -> Result<MutexName> {
    if name.is_empty() {
        return Err(HandoffError::UserError(
            "mutex name must be non-empty".to_string(),
        ));
    }

    Ok(MutexName {
        scope,
        payload: name.to_string(),
    })
}

/// Build a mutex name identifying a file or directory.
///
/// Different spellings of the same location (relative vs absolute, `.`/`..`
/// segments, trailing or doubled separators) yield the same name. The path
/// does not need to exist.
pub fn name_for_path<P: AsRef<Path>>(path: P, scope: Scope) -> Result<MutexName> {
    let canonical = canonical_path(path.as_ref())?;
    let digest = digest_hex(canonical.to_string_lossy().as_bytes());
    name_for(&digest, scope)
}

/// Absolute, lexically normalized form of `path`.
///
/// Symlinks are not resolved, so the result is the same whether or not the
/// path exists yet.
pub fn canonical_path(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(HandoffError::UserError("path must be non-empty".to_string()));
    }

    let absolute = std::path::absolute(path).map_err(|e| {
        HandoffError::UserError(format!(
            "failed to resolve absolute path for '{}': {}",
            path.display(),
            e
        ))
    })?;

    Ok(path_clean::clean(absolute))
}

/// Lowercase hex SHA-256 of `input` (64 characters).
pub fn digest_hex(input: &[u8]) -> String {
    hex::encode(Sha256::digest(input))
}
