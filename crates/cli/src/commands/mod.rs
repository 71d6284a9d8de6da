pub mod chat;
pub mod config_cmd;
pub mod history;
pub mod ingest;
pub mod suggest;

use std::path::Path;

use nugget_config::AppConfig;

/// Load `path` if given, else the default config file. Env overrides apply
/// either way.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}
