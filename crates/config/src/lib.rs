//! Configuration for `nlr`: a TOML section/option store and the typed [`Settings`] resolved
//! from it.

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
mod paths;
mod settings;
mod store;

pub use error::ConfigError;
pub use paths::{default_config_path, default_data_dir};
pub use settings::{
	DatabaseSettings, DispatchSettings, PathSettings, ProjectSettings, Settings, SourceSettings,
};
pub use store::{ConfigStore, REDACTED, SECRET_OPTIONS};
