//! Declarative task configuration: the on-disk JSON schema, the overlay
//! merge rules, and content-hash change detection.
//!
//! The schema keeps its historical PascalCase field names so existing config
//! files keep working:
//!
//! ```json
//! {
//!   "Variables": { "IMPORT_DIR": "/var/imports" },
//!   "Enabled":  ["importer"],
//!   "Disabled": ["backup"],
//!   "Commands": [
//!     { "Name": "importer", "Pool": "db", "Interval": "15m",
//!       "Timeout": "1h", "Command": "/usr/bin/importer",
//!       "Params": ["--src", "!IMPORT_DIR"], "StartTime": "" }
//!   ]
//! }
//! ```

use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ConfigError, Result};

/// Default port for the trigger/health HTTP listener.
pub const DEFAULT_PORT: u16 = 2014;
/// Default bind address for the trigger/health HTTP listener.
pub const DEFAULT_BIND: &str = "0.0.0.0";
/// Fixed period of the dispatch tick.
pub const TICK_SECS: u64 = 5;
/// Daily tasks must start within this window of their start time, or they
/// are skipped for the day. Keeps nightly jobs out of business hours when
/// the dispatcher was down over their slot.
pub const DAILY_WINDOW_SECS: i64 = 2 * 3600;
/// Fallback when a command's Interval string fails to parse.
pub const FALLBACK_INTERVAL_SECS: i64 = 3600;
/// Fallback when a command's Timeout string fails to parse.
pub const FALLBACK_TIMEOUT_SECS: i64 = 8 * 3600;
/// Soft validity bounds for intervals and timeouts. Values outside the range
/// are logged as suspect but still applied — the dispatcher never refuses to
/// run over a config mistake.
pub const MIN_SANE_SECS: i64 = 5;
pub const MAX_SANE_SECS: i64 = 24 * 3600;

/// One task specification as written in the config file. Durations stay as
/// strings here; the dispatch loop parses them with documented fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct CommandSpec {
    pub name: String,
    pub pool: String,
    pub interval: String,
    pub timeout: String,
    pub command: String,
    pub params: Vec<String>,
    pub start_time: String,
}

impl CommandSpec {
    /// Canonical per-command component of the config hash.
    pub fn hash_signature(&self) -> String {
        format!(
            "{}.{}.{}.{}.{}.{}.{}",
            self.name,
            self.pool,
            self.interval,
            self.timeout,
            self.command,
            self.params.join(","),
            self.start_time
        )
    }
}

/// A full configuration snapshot. Immutable once merged; the dispatch loop
/// folds it into the live task set without resetting runtime state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Config {
    pub variables: HashMap<String, String>,
    pub enabled: Vec<String>,
    pub disabled: Vec<String>,
    pub commands: Vec<CommandSpec>,
}

impl Config {
    /// Read and parse a config file. Any failure comes back as a
    /// [`ConfigError`] for the caller to log; the file is never required to
    /// exist for the daemon to stay up.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Malformed {
            path: path.display().to_string(),
            source,
        })
    }

    /// Merge `overlay` on top of `self`:
    /// - variables overwrite key-by-key, base-only keys survive;
    /// - the overlay's Enabled/Disabled lists move names between the lists;
    /// - overlay commands replace a base command with the same name in
    ///   place, unmatched ones are appended.
    pub fn overlay(&mut self, overlay: Config) {
        for (key, value) in overlay.variables {
            self.variables.insert(key, value);
        }

        for name in &overlay.enabled {
            self.set_command_enabled(name, true);
        }
        for name in &overlay.disabled {
            self.set_command_enabled(name, false);
        }

        for spec in overlay.commands {
            match self.commands.iter_mut().find(|c| c.name == spec.name) {
                Some(existing) => *existing = spec,
                None => self.commands.push(spec),
            }
        }
    }

    /// Force a task's enabled state by editing the Enabled/Disabled name
    /// lists, keeping the invariant that a name appears in at most one.
    pub fn set_command_enabled(&mut self, name: &str, enabled: bool) {
        if enabled {
            self.disabled.retain(|n| n != name);
            if !self.enabled.iter().any(|n| n == name) {
                self.enabled.push(name.to_string());
            }
        } else {
            self.enabled.retain(|n| n != name);
            if !self.disabled.iter().any(|n| n == name) {
                self.disabled.push(name.to_string());
            }
        }
    }

    /// The effective enabled decision per task name: Enabled entries first,
    /// then Disabled entries override. Names in neither list stay absent
    /// (and default to disabled).
    pub fn effective_enabled(&self) -> HashMap<&str, bool> {
        let mut map = HashMap::new();
        for name in &self.enabled {
            map.insert(name.as_str(), true);
        }
        for name in &self.disabled {
            map.insert(name.as_str(), false);
        }
        map
    }

    /// Hex SHA-256 over a canonical rendering of the whole config. Used to
    /// suppress log spam: the effective config is logged only when this
    /// digest changes between reload cycles. Variables are folded in sorted
    /// key order so HashMap iteration order never perturbs the digest.
    pub fn hash_signature(&self) -> String {
        let mut canon = String::new();
        canon.push_str("> Enabled: ");
        canon.push_str(&self.enabled.join(","));
        canon.push_str("> Disabled: ");
        canon.push_str(&self.disabled.join(","));

        let mut keys: Vec<&String> = self.variables.keys().collect();
        keys.sort();
        for key in keys {
            canon.push_str(&format!("({key})=({})", self.variables[key]));
        }
        for cmd in &self.commands {
            canon.push_str(&cmd.hash_signature());
        }

        hex::encode(Sha256::digest(canon.as_bytes()))
    }
}
