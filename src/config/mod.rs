mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config = parse_config(&content)
        .with_context(|| format!("Invalid config file: {:?}", path))?;

    Ok(config)
}

/// Parse and validate configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config = toml::from_str(content).context("Failed to parse config")?;

    if let Some(dir) = config.merge.work_dir.take() {
        let expanded = shellexpand::tilde(&dir.to_string_lossy()).into_owned();
        config.merge.work_dir = Some(expanded.into());
    }

    validate_config(&config)?;
    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./mergeforged.toml",
        "./config.toml",
        "~/.config/mergeforged/config.toml",
        "/etc/mergeforged/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.merge.progress_throttle_secs == 0 {
        anyhow::bail!("merge.progress_throttle_secs must be at least 1");
    }
    if config.merge.read_timeout_ms == 0 {
        anyhow::bail!("merge.read_timeout_ms must be at least 1");
    }
    if config.jobs.max_concurrent == 0 {
        anyhow::bail!("jobs.max_concurrent must be at least 1");
    }

    let standardize = &config.standardize;
    if !(standardize.fps.is_finite() && standardize.fps > 0.0) {
        anyhow::bail!("standardize.fps must be positive, got {}", standardize.fps);
    }
    if standardize.crf > 51 {
        anyhow::bail!("standardize.crf must be in 0..=51, got {}", standardize.crf);
    }
    if standardize.sample_rate == 0 || standardize.audio_channels == 0 {
        anyhow::bail!("standardize.sample_rate and standardize.audio_channels must be non-zero");
    }

    if let Some(dir) = &config.merge.work_dir {
        if !dir.exists() {
            tracing::warn!("Work directory does not exist: {:?}", dir);
        }
    }

    Ok(())
}
