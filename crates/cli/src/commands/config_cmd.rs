//! `nugget config`: Show the effective configuration.

use std::path::Path;

use nugget_config::AppConfig;

/// The config as TOML, with the API key masked.
pub fn render(config: &AppConfig) -> Result<String, toml::ser::Error> {
    let mut redacted = config.clone();
    if redacted.api_key.is_some() {
        redacted.api_key = Some("***".into());
    }
    toml::to_string_pretty(&redacted)
}

pub fn show(config: &AppConfig, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    println!("# {}", path.display());
    if !path.exists() {
        println!("# (file not found, showing defaults)");
    }
    if !config.has_api_key() {
        println!("# ⚠️  No API key set (NUGGET_API_KEY or GROQ_API_KEY)");
    }
    println!("# documents: {}", config.retrieval.documents_path().display());
    println!("# history:   {}", config.session.history_path().display());
    println!();
    println!("{}", render(config)?);
    Ok(())
}

pub fn defaults() {
    println!("# Save as {}", AppConfig::config_dir().join("config.toml").display());
    println!("{}", AppConfig::default_toml());
}
