use nlr_metadata::{FileRecord, ProvenanceLog, RelationalStore, SqlValue, SqliteStore};

use chrono::{TimeZone, Utc};
use tempfile::tempdir;
use tracing_test::traced_test;

fn record(project_id: &str, key: &str, bytes: u64) -> FileRecord {
	FileRecord {
		project_id: project_id.to_string(),
		bucket: "raw".to_string(),
		key: key.to_string(),
		path: format!("/data/{key}"),
		bytes,
		checksum: format!("checksum-of-{key}"),
		downloaded_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
	}
}

#[tokio::test]
#[traced_test]
async fn records_are_read_back_per_project() {
	let log = ProvenanceLog::new(SqliteStore::in_memory().await.unwrap());
	log.ensure_schema().await.unwrap();
	// Idempotent
	log.ensure_schema().await.unwrap();

	let files = vec![
		record("survey", "b.csv", 20),
		record("survey", "a.csv", 10),
		record("other", "c.csv", 30),
	];

	assert_eq!(log.record(&files).await.unwrap(), 3);
	assert_eq!(log.record(&[]).await.unwrap(), 0);

	let survey = log.files_for_project("survey").await.unwrap();
	assert_eq!(survey, vec![files[1].clone(), files[0].clone()]);

	assert!(log.files_for_project("missing").await.unwrap().is_empty());
}

#[tokio::test]
#[traced_test]
async fn file_database_is_created_on_connect() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("nlr.db");

	let store = SqliteStore::connect(&format!("sqlite://{}", path.display()))
		.await
		.unwrap();
	let log = ProvenanceLog::new(store);
	log.ensure_schema().await.unwrap();
	log.record(&[record("survey", "a.csv", 1)]).await.unwrap();

	assert!(path.exists());

	let count = log
		.store()
		.execute("SELECT COUNT(*) FROM dataset_files", &[])
		.await
		.unwrap();
	assert_eq!(count, vec![vec![SqlValue::Integer(1)]]);

	log.store().close().await;
}
