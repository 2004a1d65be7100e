use std::{collections::BTreeMap, num::NonZeroUsize, path::PathBuf, str::FromStr};

use tracing::Level;

use super::{error::ConfigError, store::ConfigStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
	/// Directory holding one subdirectory per bucket.
	pub root: PathBuf,
	pub bucket: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSettings {
	pub data_home: PathBuf,
	pub log_dir: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSettings {
	pub pool_size: Option<NonZeroUsize>,
	pub log_capacity: Option<usize>,
	pub log_level: Option<Level>,
}

/// Provenance database. Credentials, if any, travel inside `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
	pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSettings {
	pub bucket: Option<String>,
	pub prefix: Option<String>,
	pub destination: Option<PathBuf>,
	/// Re-download objects whose destination file already exists.
	pub force: bool,
}

/// Typed view over a [`ConfigStore`], resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
	pub source: SourceSettings,
	pub paths: PathSettings,
	pub dispatch: DispatchSettings,
	pub database: DatabaseSettings,
	pub projects: BTreeMap<String, ProjectSettings>,
}

impl Settings {
	/// Fails on the first missing required section or option, or malformed value.
	pub fn resolve(store: &ConfigStore) -> Result<Self, ConfigError> {
		let source = SourceSettings {
			root: store.get_as("source", "root")?,
			bucket: store.get_as("source", "bucket")?,
		};

		let paths = PathSettings {
			data_home: store.get_as("paths", "data_home")?,
			log_dir: store.get_as("paths", "log_dir")?,
		};

		let dispatch = DispatchSettings {
			pool_size: store
				.get_opt::<i64>("dispatch", "pool_size")?
				.map(|size| {
					usize::try_from(size)
						.ok()
						.and_then(NonZeroUsize::new)
						.ok_or_else(|| {
							ConfigError::invalid("dispatch", "pool_size", "must be a positive integer")
						})
				})
				.transpose()?,
			log_capacity: store
				.get_opt::<i64>("dispatch", "log_capacity")?
				.map(|capacity| {
					usize::try_from(capacity)
						.ok()
						.filter(|capacity| *capacity > 0)
						.ok_or_else(|| {
							ConfigError::invalid("dispatch", "log_capacity", "must be a positive integer")
						})
				})
				.transpose()?,
			log_level: store
				.get_opt::<String>("dispatch", "log_level")?
				.map(|level| {
					Level::from_str(&level)
						.map_err(|_| ConfigError::invalid("dispatch", "log_level", format!("unknown level '{level}'")))
				})
				.transpose()?,
		};

		let database = DatabaseSettings {
			url: store.get_as("database", "url")?,
		};

		let projects = store
			.subsections("projects")
			.into_iter()
			.map(|id| {
				let section = format!("projects.{id}");
				Ok((
					id.to_string(),
					ProjectSettings {
						bucket: store.get_opt(&section, "bucket")?,
						prefix: store.get_opt(&section, "prefix")?,
						destination: store.get_opt(&section, "destination")?,
						force: store.get_opt(&section, "force")?.unwrap_or(false),
					},
				))
			})
			.collect::<Result<_, ConfigError>>()?;

		Ok(Self {
			source,
			paths,
			dispatch,
			database,
			projects,
		})
	}

	#[must_use]
	pub fn project(&self, id: &str) -> Option<&ProjectSettings> {
		self.projects.get(id)
	}

	/// Bucket a project reads from, falling back to `[source] bucket`.
	#[must_use]
	pub fn bucket_for<'a>(&'a self, project: &'a ProjectSettings) -> &'a str {
		project.bucket.as_deref().unwrap_or(&self.source.bucket)
	}

	/// Where a project's downloads land, falling back to `<data_home>/<id>`.
	#[must_use]
	pub fn destination_for(&self, id: &str, project: &ProjectSettings) -> PathBuf {
		project
			.destination
			.clone()
			.unwrap_or_else(|| self.paths.data_home.join(id))
	}

	#[must_use]
	pub fn log_file_for(&self, id: &str) -> PathBuf {
		self.paths.log_dir.join(format!("{id}.log"))
	}
}
