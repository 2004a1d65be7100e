use anyhow::{Context as _, Result};
use nlr_config::{ConfigStore, Settings};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
	Human,
	Json,
}

/// Everything a command needs: the loaded configuration and how to print.
pub struct Context {
	pub format: OutputFormat,
	pub config_path: PathBuf,
	pub store: ConfigStore,
}

impl Context {
	pub fn load(config_path: PathBuf, format: OutputFormat) -> Result<Self> {
		let store = ConfigStore::load(&config_path)
			.with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

		Ok(Self {
			format,
			config_path,
			store,
		})
	}

	/// Resolves typed settings, failing on the first missing or malformed value.
	pub fn settings(&self) -> Result<Settings> {
		Settings::resolve(&self.store).with_context(|| {
			format!("Invalid configuration in {}", self.config_path.display())
		})
	}
}
