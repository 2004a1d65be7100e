//! Where datasets come from: an [`ObjectStore`] boundary, a local directory backed store, and the
//! download worker and manager that fetch a bucket through the job system.

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod error;
mod local;
mod manager;
mod plan;
mod store;
mod worker;

pub use error::SourceError;
pub use local::LocalObjectStore;
pub use manager::{DatasetManager, DownloadSummary};
pub use plan::{
	plan_downloads, PARAM_BUCKET, PARAM_DESTINATION, PARAM_FORCE, PARAM_KEY, PARAM_SIZE,
};
pub use store::{DownloadKind, DownloadStatus, ObjectInfo, ObjectStore};
pub use worker::{DownloadReceipt, DownloadWorker};
