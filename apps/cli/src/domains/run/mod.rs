use std::{path::PathBuf, sync::Arc};

use clap::Args;
use nlr_config::{ProjectSettings, Settings};
use nlr_job_system::{
	AggregationError, Dispatcher, DispatcherConfig, FileSink, Job, JobId, JobOutcome, JobResult,
	Manager, Project, RawResults,
};
use nlr_metadata::{FileRecord, MetadataError, ProvenanceLog, SqliteStore};
use nlr_sources::{
	plan_downloads, DatasetManager, DownloadKind, DownloadReceipt, DownloadSummary, DownloadWorker,
	LocalObjectStore, PARAM_KEY,
};
use serde::Serialize;
use tracing::{error, info};

use crate::util::prelude::*;

type DownloadProject = Project<DownloadWorker<LocalObjectStore>>;

#[derive(Args, Debug)]
pub struct RunArgs {
	/// Project identifier, as configured under `[projects.<id>]`
	pub project_id: String,

	/// Re-download files that already exist at their destination
	#[arg(long)]
	pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
	pub job_id: JobId,
	pub key: String,
	pub status: &'static str,
	pub duration_ms: Option<u128>,
	pub bytes: Option<u64>,
	pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
	pub project: String,
	pub status: String,
	pub submitted: usize,
	pub log_file: PathBuf,
	pub log_records: usize,
	/// Why the worker log is incomplete, if it is.
	pub log_error: Option<String>,
	pub summary: Option<DownloadSummary>,
	pub jobs: Vec<JobReport>,
}

pub async fn run(ctx: &Context, args: RunArgs) -> Result<()> {
	let settings = ctx.settings()?;
	let project_id = args.project_id;

	let project_settings = settings.project(&project_id).ok_or_else(|| {
		anyhow!("Project `{project_id}` is not configured, expected a [projects.{project_id}] section")
	})?;

	let store = Arc::new(LocalObjectStore::new(&settings.source.root));
	let force = args.force || project_settings.force;
	let mut project = plan_project(&settings, &project_id, project_settings, &store, force)?;

	let manager = DatasetManager::<LocalObjectStore>::new();
	manager.create_jobs(&mut project)?;

	let log_file = settings.log_file_for(&project_id);
	let sink = FileSink::append(&log_file)
		.with_context(|| format!("Failed to open log file {}", log_file.display()))?;

	let dispatcher = Dispatcher::new(dispatcher_config(&settings));
	info!(
		project_id,
		pool_size = dispatcher.pool_size().get(),
		jobs = project.jobs().len(),
		"Dispatching project;"
	);

	let dispatched = dispatcher.dispatch(&project, sink).await?;
	if let Some(e) = &dispatched.log_error {
		error!(%e, log_file = %log_file.display(), "Worker log is incomplete;");
	}

	let summary = match manager.process_results(&mut project, &dispatched.jobs) {
		Ok(summary) => Some(summary),
		Err(AggregationError::NoJobs) => {
			info!(project_id, "Nothing to download;");
			None
		}
		Err(e) => return Err(e.into()),
	};

	let records = file_records(&project_id, &project, &dispatched.jobs);
	if let Err(e) = record_provenance(&settings.database.url, &records).await {
		error!(?e, project_id, "Failed to record downloaded files;");
	}

	let report = RunReport {
		project: project_id,
		status: project.run_status().to_string(),
		submitted: dispatched.submitted,
		log_file,
		log_records: dispatched.log_records,
		log_error: dispatched.log_error.as_ref().map(ToString::to_string),
		summary,
		jobs: job_reports(&project, &dispatched.jobs),
	};

	print_output!(ctx, &report, print_report);

	Ok(())
}

fn plan_project(
	settings: &Settings,
	project_id: &str,
	project_settings: &ProjectSettings,
	store: &Arc<LocalObjectStore>,
	force: bool,
) -> Result<DownloadProject> {
	let bucket = settings.bucket_for(project_settings);
	let destination = settings.destination_for(project_id, project_settings);

	let params = plan_downloads(
		store.as_ref(),
		bucket,
		&destination,
		project_settings.prefix.as_deref(),
		force,
	)
	.with_context(|| format!("Failed to list bucket `{bucket}`"))?;

	Ok(Project::new(
		project_id,
		params,
		Arc::new(DownloadWorker::new(Arc::clone(store))),
	))
}

fn dispatcher_config(settings: &Settings) -> DispatcherConfig {
	let defaults = DispatcherConfig::default();
	let dispatch = &settings.dispatch;

	DispatcherConfig {
		pool_size: dispatch.pool_size,
		log_capacity: dispatch.log_capacity.unwrap_or(defaults.log_capacity),
		max_log_level: dispatch.log_level.unwrap_or(defaults.max_log_level),
	}
}

fn executed<'a>(
	job: &Job<DownloadReceipt>,
	raw: &'a RawResults<DownloadReceipt>,
) -> Option<&'a Job<DownloadReceipt>> {
	raw.get(&job.id())
}

/// One record per object fetched by this run, in job order. Skipped objects were recorded when
/// they were first downloaded.
fn file_records(
	project_id: &str,
	project: &DownloadProject,
	raw: &RawResults<DownloadReceipt>,
) -> Vec<FileRecord> {
	project
		.jobs()
		.iter()
		.filter_map(|job| executed(job, raw))
		.filter_map(|job| match (job.result(), job.end_time()) {
			(
				Some(JobResult {
					outcome: Ok(receipt),
					..
				}),
				Some(downloaded_at),
			) if receipt.kind == DownloadKind::Downloaded => Some(FileRecord {
				project_id: project_id.to_string(),
				bucket: receipt.bucket.clone(),
				key: receipt.key.clone(),
				path: receipt.path.to_string_lossy().into_owned(),
				bytes: receipt.bytes,
				checksum: receipt.checksum.clone(),
				downloaded_at,
			}),
			_ => None,
		})
		.collect()
}

async fn record_provenance(url: &str, records: &[FileRecord]) -> Result<u64, MetadataError> {
	if records.is_empty() {
		return Ok(0);
	}

	let store = SqliteStore::connect(url).await?;
	let provenance = ProvenanceLog::new(store);

	provenance.ensure_schema().await?;
	let written = provenance.record(records).await;

	provenance.store().close().await;

	written
}

fn job_reports(project: &DownloadProject, raw: &RawResults<DownloadReceipt>) -> Vec<JobReport> {
	project
		.jobs()
		.iter()
		.map(|job| {
			let duration_ms = executed(job, raw)
				.and_then(Job::duration)
				.map(|duration| duration.as_millis());

			let (status, bytes, detail) = match project.results().get(&job.id()) {
				Some(JobOutcome::Succeeded(receipt)) => match receipt.kind {
					DownloadKind::Downloaded => ("succeeded", Some(receipt.bytes), None),
					DownloadKind::Skipped => {
						("skipped", Some(receipt.bytes), Some("already exists".to_string()))
					}
				},
				Some(JobOutcome::Failed(e)) => {
					("failed", None, Some(format!("job {}: {}", e.job_id, e.cause)))
				}
				None => ("pending", None, None),
			};

			JobReport {
				job_id: job.id(),
				key: job.param_str(PARAM_KEY).unwrap_or(job.name()).to_string(),
				status,
				duration_ms,
				bytes,
				detail,
			}
		})
		.collect()
}

fn print_report(report: &RunReport) {
	if report.jobs.is_empty() {
		println!("Nothing to download for project {}", report.project);
		return;
	}

	let mut table = Table::new();
	table.load_preset(UTF8_BORDERS_ONLY);
	table.set_header(vec!["Job", "Key", "Status", "Duration (ms)", "Bytes", "Detail"]);

	for job in &report.jobs {
		table.add_row(vec![
			job.job_id.to_string(),
			job.key.clone(),
			job.status.to_string(),
			job.duration_ms.map(|ms| ms.to_string()).unwrap_or_default(),
			job.bytes.map(|bytes| bytes.to_string()).unwrap_or_default(),
			job.detail.clone().unwrap_or_default(),
		]);
	}

	println!("{table}");
	println!();
	println!("Project {}: {}", report.project, report.status);

	if let Some(summary) = &report.summary {
		println!(
			"Downloaded {} file(s), {} byte(s); {} skipped, {} failed",
			summary.downloaded, summary.total_bytes, summary.skipped, summary.failed
		);
	}

	println!("Worker log: {} ({} record(s))", report.log_file.display(), report.log_records);
	if let Some(e) = &report.log_error {
		println!("Worker log is incomplete: {e}");
	}
}

#[cfg(test)]
mod tests {
	use std::{fs, num::NonZeroUsize};

	use nlr_config::ConfigStore;
	use tracing::Level;

	use super::*;

	fn settings_for(root: &std::path::Path) -> Settings {
		let store = ConfigStore::from_toml_str(&format!(
			r#"
[source]
root = "{root}/objects"
bucket = "survey"

[paths]
data_home = "{root}/data"
log_dir = "{root}/logs"

[dispatch]
pool_size = 2
log_level = "info"

[database]
url = "sqlite://{root}/nlr.db"

[projects.alpha]
prefix = "2024/"
"#,
			root = root.display()
		))
		.unwrap();

		Settings::resolve(&store).unwrap()
	}

	fn seed_bucket(root: &std::path::Path) {
		let bucket = root.join("objects/survey/2024");
		fs::create_dir_all(&bucket).unwrap();
		fs::write(bucket.join("a.csv"), "a,b\n").unwrap();
		fs::write(bucket.join("b.csv"), "c,d,e\n").unwrap();
		fs::write(root.join("objects/survey/ignored.csv"), "x").unwrap();
	}

	fn planned_project(settings: &Settings, force: bool) -> DownloadProject {
		let project_settings = settings.project("alpha").unwrap().clone();
		let store = Arc::new(LocalObjectStore::new(&settings.source.root));

		plan_project(settings, "alpha", &project_settings, &store, force).unwrap()
	}

	async fn dispatch_planned(
		settings: &Settings,
		mut project: DownloadProject,
	) -> (DownloadProject, RawResults<DownloadReceipt>) {
		let manager = DatasetManager::<LocalObjectStore>::new();
		manager.create_jobs(&mut project).unwrap();

		let dispatched = Dispatcher::new(dispatcher_config(settings))
			.dispatch(&project, nlr_job_system::MemorySink::new())
			.await
			.unwrap();

		manager.process_results(&mut project, &dispatched.jobs).unwrap();

		(project, dispatched.jobs)
	}

	async fn dispatched_project(
		root: &std::path::Path,
	) -> (DownloadProject, RawResults<DownloadReceipt>) {
		seed_bucket(root);
		let settings = settings_for(root);
		let project = planned_project(&settings, false);

		dispatch_planned(&settings, project).await
	}

	#[test]
	fn dispatcher_config_follows_settings() {
		let dir = tempfile::tempdir().unwrap();
		let config = dispatcher_config(&settings_for(dir.path()));

		assert_eq!(config.pool_size, NonZeroUsize::new(2));
		assert_eq!(config.max_log_level, Level::INFO);
		assert_eq!(config.log_capacity, DispatcherConfig::default().log_capacity);
	}

	#[test]
	fn plans_only_prefixed_objects() {
		let dir = tempfile::tempdir().unwrap();
		let bucket = dir.path().join("objects/survey/2024");
		fs::create_dir_all(&bucket).unwrap();
		fs::write(bucket.join("a.csv"), "a").unwrap();
		fs::write(dir.path().join("objects/survey/other.csv"), "b").unwrap();

		let settings = settings_for(dir.path());
		let project_settings = settings.project("alpha").unwrap().clone();
		let store = Arc::new(LocalObjectStore::new(&settings.source.root));

		let project = plan_project(&settings, "alpha", &project_settings, &store, false).unwrap();

		assert_eq!(project.name(), "alpha");
		assert_eq!(project.params().len(), 1);
		assert_eq!(
			project.params()[0].get(PARAM_KEY).and_then(|key| key.as_str()),
			Some("2024/a.csv")
		);
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn reports_every_job_and_records_successes() {
		let dir = tempfile::tempdir().unwrap();
		let (project, raw) = dispatched_project(dir.path()).await;

		let reports = job_reports(&project, &raw);
		assert_eq!(
			reports.iter().map(|job| job.key.as_str()).collect::<Vec<_>>(),
			vec!["2024/a.csv", "2024/b.csv"]
		);
		assert!(reports.iter().all(|job| job.status == "succeeded"));
		assert_eq!(reports[0].job_id, project.jobs()[0].id());
		assert_eq!(reports[1].bytes, Some(6));

		let records = file_records("alpha", &project, &raw);
		assert_eq!(records.len(), 2);
		assert!(records.iter().all(|record| record.project_id == "alpha"));
		assert!(dir.path().join("data/alpha/2024/b.csv").is_file());

		let url = format!("sqlite://{}", dir.path().join("nlr.db").display());
		assert_eq!(record_provenance(&url, &records).await.unwrap(), 2);
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn failed_jobs_report_their_job_id() {
		let dir = tempfile::tempdir().unwrap();
		seed_bucket(dir.path());
		let settings = settings_for(dir.path());
		let project = planned_project(&settings, false);
		fs::remove_file(dir.path().join("objects/survey/2024/b.csv")).unwrap();

		let (project, raw) = dispatch_planned(&settings, project).await;
		let reports = job_reports(&project, &raw);

		let failed = &reports[1];
		assert_eq!(failed.status, "failed");
		assert_eq!(failed.key, "2024/b.csv");
		assert_eq!(failed.job_id, project.jobs()[1].id());
		assert!(failed
			.detail
			.as_deref()
			.unwrap()
			.starts_with(&format!("job {}: ", failed.job_id)));

		assert_eq!(file_records("alpha", &project, &raw).len(), 1);
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn existing_files_are_skipped_and_not_recorded_again() {
		let dir = tempfile::tempdir().unwrap();
		seed_bucket(dir.path());
		let local = dir.path().join("data/alpha/2024");
		fs::create_dir_all(&local).unwrap();
		fs::write(local.join("a.csv"), "kept").unwrap();
		let settings = settings_for(dir.path());

		let (project, raw) = dispatch_planned(&settings, planned_project(&settings, false)).await;
		let reports = job_reports(&project, &raw);

		assert_eq!(reports[0].status, "skipped");
		assert_eq!(reports[1].status, "succeeded");
		assert_eq!(fs::read_to_string(local.join("a.csv")).unwrap(), "kept");

		let records = file_records("alpha", &project, &raw);
		assert_eq!(records.len(), 1);
		assert_eq!(records[0].key, "2024/b.csv");

		let (project, raw) = dispatch_planned(&settings, planned_project(&settings, true)).await;

		assert!(job_reports(&project, &raw)
			.iter()
			.all(|job| job.status == "succeeded"));
		assert_eq!(fs::read_to_string(local.join("a.csv")).unwrap(), "a,b\n");
		assert_eq!(file_records("alpha", &project, &raw).len(), 2);
	}

	#[tokio::test]
	async fn nothing_to_record_skips_the_database() {
		assert_eq!(
			record_provenance("sqlite:///nonexistent/dir/nlr.db", &[])
				.await
				.unwrap(),
			0
		);
	}
}
