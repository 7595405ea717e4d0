//! TOML configuration for the backend origin, network timeouts and match behavior.

mod errors;
mod load;
mod save;
mod types;

#[cfg(test)]
mod tests;

use crate::app_dirs;

pub use errors::ConfigError;
pub use load::{config_path, load_from_path, load_or_default};
pub use save::{save, save_to_path};
pub use types::{
    BackendSettings, GameConfig, MIN_POLL_INTERVAL_MS, MatchSettings, NetworkSettings,
};

/// Default filename used to store the configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}
