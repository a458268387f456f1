//! Environment-driven configuration for the query and ingest sides (§6).
//!
//! Follows the teacher's `Config::load()` shape: a typed struct populated
//! from environment variables with documented defaults, rather than scattered
//! `std::env::var` calls throughout the binaries.

use std::path::PathBuf;

use crate::{Error, Result};

/// Server-side configuration, read once at process start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to bind. `PORT`, default `3456`.
    pub port: u16,
    /// Path to the SQLite database file. `DB_PATH`, default `./data/specfusion.db`.
    pub db_path: PathBuf,
    /// Bearer token required on admin routes. `ADMIN_TOKEN`, default `dev-token`.
    pub admin_token: String,
    /// Optional override for the tokenizer's user dictionary. `USERDICT_PATH`.
    pub userdict_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from the process environment, applying the
    /// documented defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(v) => v
                .parse()
                .map_err(|_| Error::Config(format!("PORT must be a valid port number, got '{v}'")))?,
            Err(_) => 3456,
        };

        let db_path = std::env::var("DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/specfusion.db"));

        let admin_token =
            std::env::var("ADMIN_TOKEN").unwrap_or_else(|_| "dev-token".to_string());

        let userdict_path = std::env::var("USERDICT_PATH").ok().map(PathBuf::from);

        Ok(Self {
            port,
            db_path,
            admin_token,
            userdict_path,
        })
    }
}

/// Ingest-side configuration for the `sync` CLI.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Base URL of the running SpecFusion server. `SPECFUSION_API_URL`.
    pub api_url: String,
    /// Bearer token used to authenticate admin requests.
    pub admin_token: String,
    /// Wecom cookie jar, as raw JSON or a `key=value; ...` string. `WECOM_COOKIES`.
    pub wecom_cookies: Option<String>,
    /// Pinduoduo cookie string. `PDD_COOKIE`.
    pub pdd_cookie: Option<String>,
    /// Path to a Pinduoduo JSON dump file, for adapters that cannot self-serve. `PDD_JSON_PATH`.
    pub pdd_json_path: Option<PathBuf>,
}

impl IngestConfig {
    /// Load ingest-side configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let api_url = std::env::var("SPECFUSION_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:3456".to_string());
        let admin_token =
            std::env::var("ADMIN_TOKEN").unwrap_or_else(|_| "dev-token".to_string());
        let wecom_cookies = std::env::var("WECOM_COOKIES").ok();
        let pdd_cookie = std::env::var("PDD_COOKIE").ok();
        let pdd_json_path = std::env::var("PDD_JSON_PATH").ok().map(PathBuf::from);

        Ok(Self {
            api_url,
            admin_token,
            wecom_cookies,
            pdd_cookie,
            pdd_json_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn server_config_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        for key in ["PORT", "DB_PATH", "ADMIN_TOKEN", "USERDICT_PATH"] {
            std::env::remove_var(key);
        }
        let cfg = ServerConfig::from_env().unwrap();
        assert_eq!(cfg.port, 3456);
        assert_eq!(cfg.db_path, PathBuf::from("./data/specfusion.db"));
        assert_eq!(cfg.admin_token, "dev-token");
        assert!(cfg.userdict_path.is_none());
    }
}
