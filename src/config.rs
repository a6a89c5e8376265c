use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Where scheduled snapshots are exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    Drive {
        access_token: String,
        folder_id: String,
    },
    LocalDir(PathBuf),
}

/// Service settings, read from the process environment (after `.env` is loaded).
///
/// Every variable has a default except `DRIVE_FOLDER_ID`, which becomes required
/// once `DRIVE_ACCESS_TOKEN` selects the Drive export target.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub feed_url: String,
    pub database_path: PathBuf,
    pub schedule_interval: Duration,
    pub fetch_timeout: Duration,
    pub upload_timeout: Duration,
    pub export_name: String,
    pub scratch_path: PathBuf,
    pub export_target: ExportTarget,
    pub admin_username: String,
    pub admin_password: String,
    pub session_ttl: chrono::Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Builds the configuration from an explicit variable map.
    ///
    /// # Errors
    /// Returns an error if a numeric variable does not parse, is zero, or the Drive
    /// target is selected without a folder id.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let get = |key: &str, default: &str| -> String {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let secs = |key: &str, default: u64| -> Result<u64> {
            let raw = get(key, &default.to_string());
            let value: u64 = raw
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds, got `{}`", key, raw))?;
            if value == 0 {
                bail!("{} must be greater than zero", key);
            }
            Ok(value)
        };

        let export_target = match vars.get("DRIVE_ACCESS_TOKEN").filter(|t| !t.trim().is_empty()) {
            Some(token) => {
                let folder_id = get("DRIVE_FOLDER_ID", "");
                if folder_id.is_empty() {
                    bail!("DRIVE_FOLDER_ID is required when DRIVE_ACCESS_TOKEN is set");
                }
                ExportTarget::Drive {
                    access_token: token.trim().to_string(),
                    folder_id,
                }
            }
            None => ExportTarget::LocalDir(PathBuf::from(get("EXPORT_DIR", "exports"))),
        };

        let session_hours = secs("SESSION_TTL_HOURS", 24)?;

        Ok(Self {
            bind_addr: get("BIND_ADDR", "0.0.0.0:3000"),
            feed_url: get("FEED_URL", "https://www.bnr.ro/nbrfxrates.xml"),
            database_path: PathBuf::from(get("DATABASE_PATH", "./db.sqlite")),
            schedule_interval: Duration::from_secs(secs("SCHEDULE_INTERVAL_SECS", 60)?),
            fetch_timeout: Duration::from_secs(secs("FETCH_TIMEOUT_SECS", 20)?),
            upload_timeout: Duration::from_secs(secs("UPLOAD_TIMEOUT_SECS", 30)?),
            export_name: get("EXPORT_NAME", "currencies.json"),
            scratch_path: PathBuf::from(get("SCRATCH_PATH", "currencies.json")),
            export_target,
            admin_username: get("ADMIN_USERNAME", "test"),
            admin_password: get("ADMIN_PASSWORD", "test"),
            session_ttl: chrono::Duration::hours(session_hours as i64),
        })
    }
}
