use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod context;
mod domains;
mod util;

use context::{Context, OutputFormat};
use domains::{config::ConfigArgs, run::RunArgs};

#[derive(Parser, Debug)]
#[command(name = "nlr", about = "Download project datasets from an object store in parallel")]
struct Cli {
	/// Path to the configuration file
	#[arg(long, env = "NLR_CONFIG")]
	config: Option<PathBuf>,

	/// Output format
	#[arg(long, value_enum, default_value = "human")]
	format: OutputFormat,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Download every object of a project
	Run(RunArgs),
	/// List configured projects
	Projects,
	/// Print a configuration section, secrets redacted
	Config(ConfigArgs),
}

fn init_tracing() {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(fmt::layer().with_writer(std::io::stderr))
		.init();
}

async fn run(cli: Cli) -> Result<()> {
	let config_path = match cli.config {
		Some(path) => path,
		None => nlr_config::default_config_path()?,
	};

	let ctx = Context::load(config_path, cli.format)?;

	match cli.command {
		Commands::Run(args) => domains::run::run(&ctx, args).await,
		Commands::Projects => domains::projects::run(&ctx).await,
		Commands::Config(args) => domains::config::run(&ctx, args).await,
	}
}

#[tokio::main]
async fn main() -> ExitCode {
	init_tracing();

	match run(Cli::parse()).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!("{e:#}");
			ExitCode::FAILURE
		}
	}
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn cli_definition_is_consistent() {
		Cli::command().debug_assert();
	}

	#[test]
	fn parses_run_with_global_options() {
		let cli = Cli::try_parse_from([
			"nlr",
			"--config",
			"/etc/nlr.toml",
			"--format",
			"json",
			"run",
			"alpha",
		])
		.unwrap();

		assert_eq!(cli.config, Some(PathBuf::from("/etc/nlr.toml")));
		assert!(matches!(cli.format, OutputFormat::Json));
		assert!(matches!(
			cli.command,
			Commands::Run(RunArgs { ref project_id, force: false }) if project_id == "alpha"
		));
	}

	#[test]
	fn run_can_be_forced() {
		let cli = Cli::try_parse_from(["nlr", "run", "--force", "alpha"]).unwrap();

		assert!(matches!(cli.command, Commands::Run(RunArgs { force: true, .. })));
	}

	#[test]
	fn run_requires_a_project_id() {
		assert!(Cli::try_parse_from(["nlr", "run"]).is_err());
	}

	#[test]
	fn config_takes_a_section() {
		let cli = Cli::try_parse_from(["nlr", "config", "projects.alpha"]).unwrap();

		assert!(matches!(cli.format, OutputFormat::Human));
		assert!(matches!(cli.command, Commands::Config(ConfigArgs { ref section }) if section == "projects.alpha"));
	}
}
