use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config file <path='{}'>: {source}", .path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("failed to write config file <path='{}'>: {source}", .path.display())]
	Write {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("config is not valid TOML: {0}")]
	Parse(#[from] toml::de::Error),
	#[error("failed to serialize config: {0}")]
	Serialize(#[from] toml::ser::Error),

	#[error("missing config section [{0}]")]
	MissingSection(String),
	#[error("missing option '{option}' in config section [{section}]")]
	MissingOption { section: String, option: String },
	#[error("invalid value for option '{option}' in config section [{section}]: {reason}")]
	InvalidValue {
		section: String,
		option: String,
		reason: String,
	},

	#[error("could not determine the platform data directory")]
	NoDataDir,
	#[error("failed to create data directory <path='{}'>: {source}", .path.display())]
	CreateDataDir {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
}

impl ConfigError {
	pub(crate) fn invalid(
		section: impl Into<String>,
		option: impl Into<String>,
		reason: impl ToString,
	) -> Self {
		Self::InvalidValue {
			section: section.into(),
			option: option.into(),
			reason: reason.to_string(),
		}
	}
}
