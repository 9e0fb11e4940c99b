mod app;
mod cache;
mod commands;
mod config;
mod connectivity;
mod db;
mod event;
mod http;
mod logging;
mod queue;
mod todos;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;

use crate::todos::types::Action;

#[derive(Parser, Debug)]
#[command(name = "todoq")]
#[command(about = "An offline-first todo client")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/todoq/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// API root, used when no config file exists
  #[arg(long, env = "TODOQ_API_URL")]
  api_url: Option<String>,

  #[command(subcommand)]
  command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
  /// Record a new todo
  Add {
    #[arg(required = true, num_args = 1..)]
    task: Vec<String>,
  },
  /// Flip completion of a todo
  Toggle { id: String },
  /// Remove a todo
  Delete { id: String },
  /// Show the current list
  List,
  /// Deliver pending actions
  Sync,
  /// Show actions awaiting the server
  Pending,
  /// Interactive shell (default)
  Shell,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration; --api-url stands in only for a missing file
  let config = config::Config::resolve(args.config.as_deref(), args.api_url)?;

  let _log_guard = logging::init(&config.data_dir()?.join("logs"))?;

  // Initialize and run the app
  let mut app = app::App::new(config).await?;
  match args.command.unwrap_or(CliCommand::Shell) {
    CliCommand::Add { task } => app.record(Action::add(task.join(" "))).await?,
    CliCommand::Toggle { id } => app.record(Action::Toggle { id }).await?,
    CliCommand::Delete { id } => app.record(Action::Delete { id }).await?,
    CliCommand::List => app.list().await?,
    CliCommand::Sync => app.sync().await?,
    CliCommand::Pending => app.pending()?,
    CliCommand::Shell => app.run_shell().await?,
  }

  Ok(())
}
