//! Server settings.
//!
//! Built-in defaults are overridden by `timetable.toml` in the working directory, then by
//! `TIMETABLE_*` environment variables (a `.env` file is loaded first if present). Nested keys
//! use a double underscore, e.g. `TIMETABLE_IMPORT__DEFAULT_MODE=strict`.

use crate::import::decoder::ColumnCasing;
use common::model::import::WriteMode;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const CONFIG_FILE: &str = "timetable.toml";
pub const ENV_PREFIX: &str = "TIMETABLE_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    /// Origin allowed by CORS, normally the web client's dev server.
    pub allowed_origin: String,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Mode used when a request does not pass `?mode=`.
    pub default_mode: WriteMode,
    pub column_casing: ColumnCasing,
    pub max_upload_bytes: usize,
    /// Synchronous imports still running after this long are cancelled and rolled back.
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
            database_path: PathBuf::from("timetable.sqlite"),
            allowed_origin: "http://localhost:3000".to_string(),
            import: ImportConfig::default(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            default_mode: WriteMode::Upsert,
            column_casing: ColumnCasing::Lower,
            max_upload_bytes: 10 * 1024 * 1024,
            timeout_secs: 60,
        }
    }
}

impl AppConfig {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load() -> Result<Self, figment::Error> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("ignoring unreadable .env file: {e}");
            }
        }
        Self::figment().extract()
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_apply_without_file_or_env() {
        Jail::expect_with(|_jail| {
            let config: AppConfig = AppConfig::figment().extract()?;
            assert_eq!(config, AppConfig::default());
            assert_eq!(config.import.default_mode, WriteMode::Upsert);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file_and_nested_keys_split_on_double_underscore() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                    port = 9000
                    database_path = "data/tt.sqlite"

                    [import]
                    column_casing = "upper"
                "#,
            )?;
            jail.set_env("TIMETABLE_PORT", "9100");
            jail.set_env("TIMETABLE_IMPORT__DEFAULT_MODE", "strict");

            let config: AppConfig = AppConfig::figment().extract()?;

            assert_eq!(config.port, 9100);
            assert_eq!(config.database_path, PathBuf::from("data/tt.sqlite"));
            assert_eq!(config.import.default_mode, WriteMode::Strict);
            assert_eq!(config.import.column_casing, ColumnCasing::Upper);
            assert_eq!(config.import.timeout_secs, 60);
            Ok(())
        });
    }

    #[test]
    fn unknown_mode_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("TIMETABLE_IMPORT__DEFAULT_MODE", "yolo");
            assert!(AppConfig::figment().extract::<AppConfig>().is_err());
            Ok(())
        });
    }
}
