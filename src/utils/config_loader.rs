use std::path::Path;

use anyhow::{Context, Result};

use crate::config::proc_loader::file_to_config;
use crate::ServiceConfig;

/// Load, expand and validate the service YAML at `config_path`.
pub async fn run(config_path: &str) -> Result<ServiceConfig> {
    let path = Path::new(config_path);
    file_to_config(path)
        .await
        .with_context(|| format!("invalid config '{}'", path.display()))
}
