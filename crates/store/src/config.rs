//! Store configuration, read from `MATCHNG_*` environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Version stamped into every envelope and key. Bump it when the persisted
/// shapes change; older data then reads as absent.
pub const STORAGE_VERSION: u32 = 1;
pub const DEFAULT_PREFIX: &str = "matchNG";
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_CHANGE_POLL: Duration = Duration::from_millis(250);
pub const DEFAULT_SENSITIVE_FIELDS: &[&str] = &["name", "email", "bio"];

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// First segment of every key, e.g. `matchNG` in `matchNG:v1:users`.
    pub prefix: String,
    pub version: u32,
    /// Budget used for the usage percentage and the SQLite quota.
    pub quota_bytes: u64,
    /// Object keys whose string values are obfuscated at rest.
    pub sensitive_fields: Vec<String>,
    /// Window of the [`DebouncedWriter`](crate::DebouncedWriter) used for drafts.
    pub debounce: Duration,
    /// How often a SQLite store checks for other processes' changes.
    pub change_poll: Duration,
    /// SQLite file; `None` means `{data_dir}/matchng/store.db`.
    pub db_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            version: STORAGE_VERSION,
            quota_bytes: DEFAULT_QUOTA_BYTES,
            sensitive_fields: DEFAULT_SENSITIVE_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
            debounce: DEFAULT_DEBOUNCE,
            change_poll: DEFAULT_CHANGE_POLL,
            db_path: None,
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            prefix: std::env::var("MATCHNG_STORAGE_PREFIX")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(defaults.prefix),
            version: defaults.version,
            quota_bytes: env_or("MATCHNG_QUOTA_BYTES", defaults.quota_bytes),
            sensitive_fields: defaults.sensitive_fields,
            debounce: Duration::from_millis(env_or(
                "MATCHNG_DEBOUNCE_MS",
                defaults.debounce.as_millis() as u64,
            )),
            change_poll: Duration::from_millis(
                env_or("MATCHNG_CHANGE_POLL_MS", defaults.change_poll.as_millis() as u64).max(10),
            ),
            db_path: std::env::var_os("MATCHNG_DB_PATH").map(PathBuf::from),
        }
    }
}

/// Parse an environment variable, falling back to `default` when it is unset
/// or malformed (malformed values are logged).
pub fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                warn!(var = name, value = %raw, "invalid value; using default");
                default
            }
        },
        Err(_) => default,
    }
}
