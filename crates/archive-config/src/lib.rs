mod app_env;

pub use app_env::{app_env, AppEnv};

use once_cell::sync::OnceCell;
use serde::Deserialize;

/// ArchiveConfig is the process-wide, layered settings object: a base
/// file, an environment-specific override file, then `ARCHIVE_`-prefixed
/// env vars, in that order — the same three-tier load the teacher's
/// `control::config` performs, adapted to the `config` crate's builder API
/// (the teacher's pinned `config` release predates it and used
/// `Config::default().merge(...)`, which no longer exists on the
/// workspace's `config = "0.13"`).
#[derive(Debug, Deserialize)]
pub struct ArchiveConfig {
    pub app_name: String,
    pub bind_address: String,
    pub database_url: String,
    pub rust_log: String,

    pub ingest: IngestSettings,
    pub storage: StorageSettings,
    pub search: SearchSettings,
    pub notify: NotifySettings,
    pub runtime: RuntimeSettings,
}

#[derive(Debug, Deserialize)]
pub struct IngestSettings {
    pub retry_base_seconds: u64,
    pub retry_max_seconds: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", tag = "backend")]
pub enum StorageSettings {
    Disk { disk_root: String },
    ObjectStore {
        endpoint: String,
        access_key: String,
        secret_key: String,
        secure: bool,
        bucket: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", tag = "backend")]
pub enum SearchSettings {
    Db,
    External {
        url: String,
        api_key: Option<String>,
        index_name: String,
        timeout_seconds: f64,
    },
}

impl SearchSettings {
    pub fn auto_sync_default() -> bool {
        true
    }
}

#[derive(Debug, Deserialize)]
pub struct NotifySettings {
    pub callback_url: Option<String>,
    pub notify_enabled: bool,
    pub action_secret: String,
    pub action_ttl_seconds: i64,
}

#[derive(Debug, Deserialize)]
pub struct RuntimeSettings {
    pub read_only_mode: bool,
    pub session_max_age_seconds: u64,
    pub cors_allow_origins: Vec<String>,
    pub search_auto_sync: bool,
}

pub fn settings() -> &'static ArchiveConfig {
    static SETTINGS: OnceCell<ArchiveConfig> = OnceCell::new();

    SETTINGS.get_or_init(|| load_settings().expect("failed to load ArchiveConfig"))
}

fn load_settings() -> Result<ArchiveConfig, config::ConfigError> {
    let current_dir = std::env::current_dir().expect("current directory is available");
    let config_dir = current_dir.join("config");

    let builder = config::Config::builder()
        .add_source(config::File::from(config_dir.join("base")).required(true))
        .add_source(config::File::from(config_dir.join(app_env().as_str())).required(false))
        .add_source(
            config::Environment::with_prefix("ARCHIVE")
                .separator("__")
                .try_parsing(true),
        );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_env_round_trips_known_values() {
        assert_eq!(AppEnv::try_from("production".to_owned()).unwrap().as_str(), "production");
        assert!(AppEnv::try_from("bogus".to_owned()).is_err());
    }
}
