//! CLI entry point - the composition root.
//!
//! Read-only commands work on the persisted record; job commands go through
//! the one `InstallManager` built by bootstrap.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crimson_cli::{Cli, CliConfig, Commands, bootstrap, handlers, resolve_env};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables (working directory, then data directory)
    dotenvy::dotenv().ok();
    if let Ok(path) = crimson_core::env_file_path() {
        dotenvy::from_path(path).ok();
    }

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = CliConfig {
        data_dir: cli.data_dir,
        engine: cli.engine,
    };
    let env = resolve_env(&config)?;

    match command {
        Commands::Queue => handlers::queue::execute(&env).await,
        Commands::History { limit } => handlers::history::execute(&env, limit).await,
        Commands::Paths => {
            handlers::paths::execute(&env);
            Ok(())
        }
        job_command => {
            let jobs = job_command
                .job_requests(env.default_install_path())
                .unwrap_or_default();
            let ctx = bootstrap(env).await?;
            handlers::jobs::execute(&ctx, jobs).await
        }
    }
}

/// Logs go to stderr so they never tear the progress bar on stdout.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
