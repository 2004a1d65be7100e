use std::{fs, path::PathBuf};

use super::error::ConfigError;

const APP_DIR: &str = "nlr";
const CONFIG_FILE: &str = "nlr.toml";

/// Platform-specific data directory resolution
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
	#[cfg(target_os = "linux")]
	let base = dirs::data_local_dir();

	#[cfg(not(target_os = "linux"))]
	let base = dirs::data_dir();

	let dir = base.ok_or(ConfigError::NoDataDir)?.join(APP_DIR);

	// Create directory if it doesn't exist
	fs::create_dir_all(&dir).map_err(|source| ConfigError::CreateDataDir {
		path: dir.clone(),
		source,
	})?;

	Ok(dir)
}

/// `nlr.toml` inside [`default_data_dir`].
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
	default_data_dir().map(|dir| dir.join(CONFIG_FILE))
}
