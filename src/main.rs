mod config;
mod db;
mod directory;
mod error;
mod github;
mod resolver;
mod store;
#[cfg(test)]
mod testing;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LogConfig};
use crate::db::{ProjectReleases, Release, ReleaseDb};
use crate::directory::Directory;
use crate::github::GitHubClient;
use crate::resolver::Resolver;
use crate::store::{SqliteStore, Store};

#[derive(Parser, Debug)]
#[command(name = "relwatch")]
#[command(about = "Track the latest stable and next pre-release of GitHub projects")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/relwatch/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Path to the database file
  #[arg(short, long, global = true)]
  db: Option<PathBuf>,

  /// GitHub auth token (default: read from $GITHUB_TOKEN)
  #[arg(short, long, global = true)]
  auth: Option<String>,

  /// Owner used for bare repository names
  #[arg(long, global = true)]
  owner: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Add a new project to the dashboard
  Add {
    /// owner/repo, or repo under the default owner
    spec: String,
  },
  /// Resolve and show the releases of every tracked project
  List {
    /// Show stored releases without contacting GitHub
    #[arg(long)]
    cached: bool,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration, then let the command line override it
  let config = Config::load(args.config.as_deref())?.with_overrides(args.db, args.auth, args.owner)?;

  let _log_guard = init_logging(&config.log)?;

  let store = Arc::new(SqliteStore::open(&config.database_path()?)?);
  let client = Arc::new(GitHubClient::new(
    &config.github,
    config.github.resolve_token().as_deref(),
  )?);
  let db = ReleaseDb::new(Arc::clone(&store));

  let result: Result<()> = match args.command {
    Command::Add { spec } => {
      let directory = Directory::new(db, client, config.default_owner.clone());
      directory
        .add_project(&spec)
        .await
        .map(|project| println!("Added {} ({})", project.name, project.url))
        .map_err(Into::into)
    }
    Command::List { cached: true } => {
      let directory = Directory::new(db, client, config.default_owner.clone());
      directory
        .list_projects()
        .map(|tracked| {
          let projects: Vec<ProjectReleases> = tracked.into_iter().map(ProjectReleases::from).collect();
          print_projects(&projects);
        })
        .map_err(Into::into)
    }
    Command::List { cached: false } => {
      let resolver = Resolver::new(db, client).with_concurrency(config.github.concurrency);
      resolver
        .list_projects_with_state()
        .await
        .map(|projects| print_projects(&projects))
        .map_err(Into::into)
    }
  };

  store.close()?;
  result
}

/// Send tracing output to stderr, or to the configured log file.
fn init_logging(config: &LogConfig) -> Result<WorkerGuard> {
  let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

  let (writer, guard) = match &config.file {
    Some(path) => {
      let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
      let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("Invalid log file path: {}", path.display()))?;
      std::fs::create_dir_all(dir)?;
      tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name))
    }
    None => tracing_appender::non_blocking(std::io::stderr()),
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(config.file.is_none())
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}

fn print_projects(projects: &[ProjectReleases]) {
  if projects.is_empty() {
    println!("No projects tracked yet. Add one with `relwatch add owner/repo`.");
    return;
  }

  let width = projects
    .iter()
    .map(|p| p.project.name.len())
    .max()
    .unwrap_or(0);

  for p in projects {
    println!(
      "{:<width$}  {:<28}  {}",
      p.project.name,
      describe(&p.latest),
      describe(&p.next_prerelease),
      width = width
    );
  }
}

fn describe(release: &Release) -> String {
  format!("{} ({})", release.tag, release.label().as_str())
}
