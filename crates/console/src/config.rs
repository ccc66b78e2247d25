use anyhow::Context;
use protocol::config::{is_http_url, ClientConfig};
use std::path::Path;

use crate::cli::Args;

pub(crate) const API_URL_ENV: &str = "HACKAWARE_API_URL";

/// Defaults, then the config file, then `HACKAWARE_API_URL`, then
/// `--base-url`.
pub(crate) fn load_client_config(args: &Args) -> anyhow::Result<ClientConfig> {
    let config = match &args.config {
        Some(path) => read_config_file(path)?,
        None => ClientConfig::default(),
    };
    let config = apply_base_url_overrides(
        config,
        std::env::var(API_URL_ENV).ok(),
        args.base_url.clone(),
    );
    validate_client_config(&config)?;
    Ok(config)
}

fn read_config_file(path: &Path) -> anyhow::Result<ClientConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("failed to parse config {}", path.display()))
}

fn apply_base_url_overrides(
    mut config: ClientConfig,
    env_url: Option<String>,
    flag_url: Option<String>,
) -> ClientConfig {
    for url in [env_url, flag_url].into_iter().flatten() {
        let url = url.trim();
        if !url.is_empty() {
            config.base_url = url.to_string();
        }
    }
    config
}

fn validate_client_config(config: &ClientConfig) -> anyhow::Result<()> {
    let base_url = config.base_url.trim();
    if base_url.is_empty() {
        anyhow::bail!("base_url must be set (config, {API_URL_ENV} or --base-url)");
    }
    if !is_http_url(base_url) {
        anyhow::bail!("base_url must start with http:// or https://, got {base_url}");
    }
    if config.progress.step == 0 {
        anyhow::bail!("progress.step must be greater than zero");
    }
    if config.progress.max == 0 {
        anyhow::bail!("progress.max must be greater than zero");
    }
    Ok(())
}
