use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use manifest_updater_lib::consts::CONFIG_ENV_VAR;

mod cmd;
mod output;

use cmd::{PayloadSource, UpdateArgs, cmd_update};
use output::{OutputFormat, print_error};

/// update-manifest - Record package and application builds in manifest.yaml
#[derive(Parser)]
#[command(name = "update-manifest")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Directory containing manifest.yaml
  repo_path: PathBuf,

  /// JSON update payload
  #[arg(required_unless_present = "updates_file", conflicts_with = "updates_file")]
  updates: Option<String>,

  /// Read the JSON update payload from a file ("-" reads stdin)
  #[arg(long, value_name = "PATH")]
  updates_file: Option<PathBuf>,

  /// Updater config file (TOML)
  #[arg(long, value_name = "PATH", env = CONFIG_ENV_VAR)]
  config: Option<PathBuf>,

  /// Distribution codename written into package records
  #[arg(long, value_name = "NAME")]
  distribution: Option<String>,

  /// Show what would change without writing the manifest
  #[arg(long)]
  dry_run: bool,

  /// Report format
  #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  /// Enable verbose output
  #[arg(short, long)]
  verbose: bool,
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  // Initialize logging
  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .with_target(false)
    .without_time()
    .init();

  let payload = match (cli.updates, cli.updates_file) {
    (Some(text), _) => PayloadSource::Inline(text),
    (None, Some(path)) => PayloadSource::File(path),
    (None, None) => {
      print_error("No update payload given");
      return ExitCode::FAILURE;
    }
  };

  let args = UpdateArgs {
    repo_path: cli.repo_path,
    payload,
    config: cli.config,
    distribution: cli.distribution,
    dry_run: cli.dry_run,
    output: cli.output,
  };

  match cmd_update(args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}
