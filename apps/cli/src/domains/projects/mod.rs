use std::path::PathBuf;

use nlr_config::Settings;
use serde::Serialize;

use crate::util::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectEntry {
	pub id: String,
	pub bucket: String,
	pub prefix: Option<String>,
	pub destination: PathBuf,
	pub force: bool,
	pub log_file: PathBuf,
}

pub async fn run(ctx: &Context) -> Result<()> {
	let entries = project_entries(&ctx.settings()?);

	print_output!(ctx, &entries, |entries: &Vec<ProjectEntry>| {
		if entries.is_empty() {
			println!("No projects configured in {}", ctx.config_path.display());
			return;
		}

		let mut table = Table::new();
		table.load_preset(UTF8_BORDERS_ONLY);
		table.set_header(vec!["Project", "Bucket", "Prefix", "Destination", "Force"]);

		for entry in entries {
			table.add_row(vec![
				entry.id.clone(),
				entry.bucket.clone(),
				entry.prefix.clone().unwrap_or_default(),
				entry.destination.display().to_string(),
				entry.force.to_string(),
			]);
		}

		println!("{table}");
	});

	Ok(())
}

/// Every configured project with its fallbacks applied, ordered by id.
pub fn project_entries(settings: &Settings) -> Vec<ProjectEntry> {
	settings
		.projects
		.iter()
		.map(|(id, project)| ProjectEntry {
			id: id.clone(),
			bucket: settings.bucket_for(project).to_string(),
			prefix: project.prefix.clone(),
			destination: settings.destination_for(id, project),
			force: project.force,
			log_file: settings.log_file_for(id),
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use nlr_config::ConfigStore;

	use super::*;

	#[test]
	fn entries_apply_fallbacks() {
		let store = ConfigStore::from_toml_str(
			r#"
[source]
root = "/srv/objects"
bucket = "survey"

[paths]
data_home = "/srv/data"
log_dir = "/srv/logs"

[database]
url = "sqlite::memory:"

[projects.beta]
bucket = "archive"
destination = "/mnt/beta"
force = true

[projects.alpha]
prefix = "2024/"
"#,
		)
		.unwrap();

		let entries = project_entries(&Settings::resolve(&store).unwrap());

		assert_eq!(
			entries,
			vec![
				ProjectEntry {
					id: "alpha".to_string(),
					bucket: "survey".to_string(),
					prefix: Some("2024/".to_string()),
					destination: PathBuf::from("/srv/data/alpha"),
					force: false,
					log_file: PathBuf::from("/srv/logs/alpha.log"),
				},
				ProjectEntry {
					id: "beta".to_string(),
					bucket: "archive".to_string(),
					prefix: None,
					destination: PathBuf::from("/mnt/beta"),
					force: true,
					log_file: PathBuf::from("/srv/logs/beta.log"),
				},
			]
		);
	}
}
