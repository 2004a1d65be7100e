use nlr_config::{ConfigError, ConfigStore, Settings};

use std::fs;

use tempfile::tempdir;

#[test]
fn settings_resolve_from_a_file_on_disk() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("nlr.toml");

	fs::write(
		&path,
		format!(
			r#"
[source]
root = "{root}"
bucket = "raw"

[paths]
data_home = "{root}/data"
log_dir = "{root}/logs"

[database]
url = "sqlite://{root}/nlr.db"

[projects.survey]
prefix = "scans/"
"#,
			root = dir.path().display()
		),
	)
	.unwrap();

	let settings = Settings::resolve(&ConfigStore::load(&path).unwrap()).unwrap();

	assert_eq!(settings.source.root, dir.path());
	assert!(!settings.project("survey").unwrap().force);
	assert_eq!(
		settings.project("survey").unwrap().prefix.as_deref(),
		Some("scans/")
	);
	assert_eq!(
		settings.log_file_for("survey"),
		dir.path().join("logs").join("survey.log")
	);
}

#[test]
fn edited_store_round_trips_through_disk() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("nlr.toml");

	let mut store = ConfigStore::new();
	store.set("source", "root", "/srv").unwrap();
	store.set("database", "token", "abc").unwrap();
	store.save(&path).unwrap();

	let mut loaded = ConfigStore::load(&path).unwrap();
	assert!(loaded.remove_option("database", "token"));
	loaded.save(&path).unwrap();

	let reloaded = ConfigStore::load(&path).unwrap();
	assert!(reloaded.exists("database"));
	assert!(matches!(
		reloaded.get("database", "token"),
		Err(ConfigError::MissingOption { .. })
	));
}

#[test]
fn malformed_file_is_a_parse_error() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("nlr.toml");
	fs::write(&path, "[source\nroot = ").unwrap();

	assert!(matches!(
		ConfigStore::load(&path),
		Err(ConfigError::Parse(_))
	));
}
