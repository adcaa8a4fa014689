//! CLI subcommands.

pub mod config;
pub mod index;
pub mod run;

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use recon_core::ReconConfig;

/// Default location of the user configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("recon")
        .join("config.json")
}

/// Load configuration from `-c`, else the user config file, else defaults,
/// then apply `RECON_*` environment overrides.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ReconConfig> {
    let mut config = match config_path {
        Some(path) => ReconConfig::from_file(Path::new(path))?,
        None => {
            let default_path = default_config_path();
            if default_path.is_file() {
                debug!("Using config {}", default_path.display());
                ReconConfig::from_file(&default_path)?
            } else {
                ReconConfig::default()
            }
        }
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Progress bar for `len` documents.
pub fn document_progress(len: usize) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents")?
            .progress_chars("=>-"),
    );
    Ok(pb)
}
