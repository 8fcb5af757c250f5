//! Configuration loading for the console

use std::collections::HashMap;
use std::path::Path;
use syncc_config::{
    apply_cli_overrides, apply_environment_overrides, load_config, validate_config, ConfigError,
    ConfigResult, SynccConfig,
};
use tracing::warn;

/// Load and validate the configuration.
///
/// With no explicit path and no file found on disk, built-in defaults are
/// used, still subject to environment and CLI overrides.
pub fn load_configuration(
    path: Option<&Path>,
    overrides: &HashMap<String, String>,
) -> ConfigResult<SynccConfig> {
    let config = match load_config(path, Some(overrides)) {
        Ok(config) => config,
        Err(ConfigError::FileNotFound(searched)) if path.is_none() => {
            warn!("No configuration file, using defaults. {}", searched);
            let mut config = SynccConfig::default();
            apply_environment_overrides(&mut config);
            apply_cli_overrides(&mut config, overrides);
            config
        }
        Err(e) => return Err(e),
    };

    validate_config(&config)?;
    Ok(config)
}
