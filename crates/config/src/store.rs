use std::{fs, path::Path};

use serde::de::DeserializeOwned;
use toml::{Table, Value};
use tracing::{debug, info};

use super::error::ConfigError;

/// Options whose values never leave the store unmasked.
pub const SECRET_OPTIONS: [&str; 4] = ["password", "secret", "token", "key_secret"];

pub const REDACTED: &str = "*****";

/// Section → option → value store backed by a TOML document.
///
/// Section names may be dotted (`projects.alpha`) to address nested tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigStore {
	root: Table,
}

impl ConfigStore {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();

		info!("Loading config from {}", path.display());

		let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;

		Self::from_toml_str(&contents)
	}

	pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
		Ok(Self {
			root: toml::from_str(contents)?,
		})
	}

	/// Writes the whole store to `path`, creating parent directories when needed.
	pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
		let path = path.as_ref();
		let write_error = |source| ConfigError::Write {
			path: path.to_path_buf(),
			source,
		};

		if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(write_error)?;
		}

		fs::write(path, toml::to_string_pretty(&self.root)?).map_err(write_error)?;

		info!("Saved config to {}", path.display());

		Ok(())
	}

	#[must_use]
	pub fn exists(&self, section: &str) -> bool {
		self.section(section).is_some()
	}

	#[must_use]
	pub fn section(&self, name: &str) -> Option<&Table> {
		name.split('.')
			.try_fold(&self.root, |table, part| table.get(part)?.as_table())
	}

	/// Names of the tables nested directly under `section`.
	#[must_use]
	pub fn subsections(&self, section: &str) -> Vec<&str> {
		self.section(section)
			.map(|table| {
				table
					.iter()
					.filter(|(_, value)| value.is_table())
					.map(|(name, _)| name.as_str())
					.collect()
			})
			.unwrap_or_default()
	}

	pub fn get(&self, section: &str, option: &str) -> Result<&Value, ConfigError> {
		self.section(section)
			.ok_or_else(|| ConfigError::MissingSection(section.to_string()))?
			.get(option)
			.ok_or_else(|| ConfigError::MissingOption {
				section: section.to_string(),
				option: option.to_string(),
			})
	}

	/// Typed read of a required option.
	pub fn get_as<T: DeserializeOwned>(&self, section: &str, option: &str) -> Result<T, ConfigError> {
		self.get(section, option)
			.and_then(|value| convert(section, option, value))
	}

	/// Typed read of an option that may be absent. A missing section reads as a missing option.
	pub fn get_opt<T: DeserializeOwned>(
		&self,
		section: &str,
		option: &str,
	) -> Result<Option<T>, ConfigError> {
		self.section(section)
			.and_then(|table| table.get(option))
			.map(|value| convert(section, option, value))
			.transpose()
	}

	pub fn get_or<T: DeserializeOwned>(
		&self,
		section: &str,
		option: &str,
		default: T,
	) -> Result<T, ConfigError> {
		self.get_opt(section, option)
			.map(|value| value.unwrap_or(default))
	}

	/// Sets one option, creating the section when it does not exist yet.
	pub fn set(
		&mut self,
		section: &str,
		option: &str,
		value: impl Into<Value>,
	) -> Result<(), ConfigError> {
		debug!(section, option, "Setting config option;");

		self.section_mut(section)?
			.insert(option.to_string(), value.into());

		Ok(())
	}

	pub fn set_many<K, V>(
		&mut self,
		section: &str,
		options: impl IntoIterator<Item = (K, V)>,
	) -> Result<(), ConfigError>
	where
		K: Into<String>,
		V: Into<Value>,
	{
		let table = self.section_mut(section)?;

		for (option, value) in options {
			table.insert(option.into(), value.into());
		}

		Ok(())
	}

	/// Returns whether the section existed.
	pub fn remove_section(&mut self, name: &str) -> bool {
		let (parent, key) = match name.rsplit_once('.') {
			Some((parent, key)) => (self.existing_section_mut(parent), key),
			None => (Some(&mut self.root), name),
		};

		parent.is_some_and(|table| {
			if table.get(key).is_some_and(Value::is_table) {
				table.remove(key);
				true
			} else {
				false
			}
		})
	}

	/// Returns whether the option existed.
	pub fn remove_option(&mut self, section: &str, option: &str) -> bool {
		self.existing_section_mut(section)
			.and_then(|table| table.remove(option))
			.is_some()
	}

	/// A copy of `name` with every secret option masked, nested tables included.
	pub fn redacted_section(&self, name: &str) -> Result<Table, ConfigError> {
		self.section(name)
			.map(redact)
			.ok_or_else(|| ConfigError::MissingSection(name.to_string()))
	}

	fn section_mut(&mut self, name: &str) -> Result<&mut Table, ConfigError> {
		let mut table = &mut self.root;

		for part in name.split('.') {
			table = table
				.entry(part.to_string())
				.or_insert(Value::Table(Table::new()))
				.as_table_mut()
				.ok_or_else(|| ConfigError::invalid(name, part, "is an option, not a section"))?;
		}

		Ok(table)
	}

	fn existing_section_mut(&mut self, name: &str) -> Option<&mut Table> {
		name.split('.')
			.try_fold(&mut self.root, |table, part| table.get_mut(part)?.as_table_mut())
	}
}

fn convert<T: DeserializeOwned>(section: &str, option: &str, value: &Value) -> Result<T, ConfigError> {
	value
		.clone()
		.try_into()
		.map_err(|e: toml::de::Error| ConfigError::invalid(section, option, e.message()))
}

fn redact(table: &Table) -> Table {
	table
		.iter()
		.map(|(option, value)| {
			let value = match value {
				Value::Table(nested) => Value::Table(redact(nested)),
				_ if SECRET_OPTIONS.contains(&option.as_str()) => Value::String(REDACTED.to_string()),
				other => other.clone(),
			};
			(option.clone(), value)
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use tempfile::tempdir;

	use super::*;

	const SAMPLE: &str = r#"
[source]
root = "/srv/buckets"
bucket = "raw"

[database]
url = "sqlite://nlr.db"
password = "hunter2"

[projects.alpha]
prefix = "2024/"

[projects.beta]
bucket = "archive"
token = "abc"
"#;

	fn sample() -> ConfigStore {
		ConfigStore::from_toml_str(SAMPLE).expect("valid toml")
	}

	#[test]
	fn reads_sections_and_options() {
		let store = sample();

		assert!(store.exists("source"));
		assert!(store.exists("projects.alpha"));
		assert!(!store.exists("projects.gamma"));
		assert_eq!(store.subsections("projects"), ["alpha", "beta"]);

		let root: PathBuf = store.get_as("source", "root").expect("root");
		assert_eq!(root, PathBuf::from("/srv/buckets"));
		assert_eq!(
			store.get_or("dispatch", "pool_size", 4_i64).expect("default"),
			4
		);
	}

	#[test]
	fn missing_values_are_typed_errors() {
		let store = sample();

		assert!(matches!(
			store.get("paths", "log_dir"),
			Err(ConfigError::MissingSection(section)) if section == "paths"
		));
		assert!(matches!(
			store.get("source", "region"),
			Err(ConfigError::MissingOption { section, option })
				if section == "source" && option == "region"
		));
		assert!(matches!(
			store.get_as::<i64>("source", "bucket"),
			Err(ConfigError::InvalidValue { option, .. }) if option == "bucket"
		));
	}

	#[test]
	fn set_creates_sections_and_remove_reports_presence() {
		let mut store = sample();

		store.set("dispatch", "pool_size", 8_i64).expect("set");
		store
			.set_many("projects.gamma", [("bucket", "g"), ("prefix", "x/")])
			.expect("set many");

		assert_eq!(store.get_as::<i64>("dispatch", "pool_size").expect("set"), 8);
		assert_eq!(store.subsections("projects").len(), 3);

		assert!(store.remove_option("projects.gamma", "prefix"));
		assert!(!store.remove_option("projects.gamma", "prefix"));
		assert!(store.remove_section("projects.gamma"));
		assert!(!store.remove_section("projects.gamma"));
		assert!(store.remove_section("dispatch"));
		assert!(!store.exists("dispatch"));

		assert!(matches!(
			store.set("source.bucket", "nested", 1_i64),
			Err(ConfigError::InvalidValue { .. })
		));
	}

	#[test]
	fn redaction_masks_secrets_only() {
		let store = sample();

		let database = store.redacted_section("database").expect("section");
		assert_eq!(database["password"].as_str(), Some(REDACTED));
		assert_eq!(database["url"].as_str(), Some("sqlite://nlr.db"));

		let projects = store.redacted_section("projects").expect("section");
		assert_eq!(projects["beta"]["token"].as_str(), Some(REDACTED));

		// The store itself is untouched
		assert_eq!(
			store.get_as::<String>("database", "password").expect("password"),
			"hunter2"
		);
	}

	#[test]
	fn save_and_load_preserve_contents() {
		let dir = tempdir().expect("temp dir");
		let path = dir.path().join("nested").join("nlr.toml");

		let store = sample();
		store.save(&path).expect("saved");

		assert_eq!(ConfigStore::load(&path).expect("loaded"), store);
	}

	#[test]
	fn unreadable_file_reports_its_path() {
		let dir = tempdir().expect("temp dir");
		let path = dir.path().join("absent.toml");

		assert!(matches!(
			ConfigStore::load(&path),
			Err(ConfigError::Read { path: reported, .. }) if reported == path
		));
	}
}
