use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use lakectl_core::{ClientRegistry, Config, Router, Settings, SettingsFactory, build_router};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod error;
mod output;

use cli::{Cli, Commands};
use error::LakectlError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level
    init_tracing(cli.verbose);

    // Load configuration from specified path or default location. An
    // explicit config file pins the run to that file alone, so the
    // environment-variable layer is disabled for it.
    let (config, config_path) = if let Some(config_file) = &cli.config_file {
        let path = PathBuf::from(config_file);
        debug!("Loading config from explicit path: {:?}", path);
        let config = Config::load_from_path(&path)?;
        (config, Some(path))
    } else {
        debug!("Loading config from default location");
        (Config::load()?, None)
    };

    if let Err(e) = execute_command(&cli, &config, config_path.as_deref()).await {
        eprintln!("{}", e.display_with_suggestions());
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "lakectl=warn,lakectl_core=warn",
            1 => "lakectl=info,lakectl_core=info",
            2 => "lakectl=debug,lakectl_core=debug",
            _ => "lakectl=trace,lakectl_core=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

/// Resolve settings and assemble a router for dispatching commands.
fn build_dispatch_router(cli: &Cli, config: &Config) -> Result<Router, LakectlError> {
    let use_env = cli.config_file.is_none();
    let mut settings: Settings = config.resolve(cli.profile.as_deref(), use_env)?;
    if let Some(attempts) = cli.retry_attempts {
        settings.resilience.max_attempts = attempts;
    }
    let resilience = settings.resilience.clone();
    let registry = Arc::new(ClientRegistry::new(
        Arc::new(SettingsFactory::new(settings)),
        resilience.retry_policy(),
    ));
    Ok(build_router(registry, resilience))
}

async fn execute_command(
    cli: &Cli,
    config: &Config,
    config_path: Option<&std::path::Path>,
) -> Result<(), LakectlError> {
    trace!("Executing command: {:?}", cli.command);
    info!("Command: {}", format_command(&cli.command));

    let start = std::time::Instant::now();
    let result = match &cli.command {
        Commands::Ops => {
            let router = build_dispatch_router(cli, config)?;
            commands::ops::run(&router, cli.output)
        }

        Commands::Call { operation, data } => {
            let router = build_dispatch_router(cli, config)?;
            commands::call::run(&router, operation, data.as_deref(), cli.output).await
        }

        Commands::Profile { command } => {
            debug!("Executing profile command");
            commands::profile::handle_profile_command(command, config, config_path, cli.output)
                .await
        }

        Commands::Version => {
            let output_data = serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "name": env!("CARGO_PKG_NAME"),
            });
            output::print_value(&output_data, cli.output)
        }

        Commands::Completions { shell } => {
            debug!("Generating completions for {:?}", shell);
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    };

    let duration = start.elapsed();
    match &result {
        Ok(_) => info!("Command completed successfully in {:?}", duration),
        Err(e) => error!("Command failed after {:?}: {}", duration, e),
    }

    result
}

/// Format command for human-readable logging (without sensitive data)
fn format_command(command: &Commands) -> String {
    match command {
        Commands::Ops => "ops".to_string(),
        Commands::Call { operation, data } => {
            format!(
                "call {} {}",
                operation,
                if data.is_some() { "with data" } else { "no data" }
            )
        }
        Commands::Profile { command } => {
            use cli::ProfileCommands::*;
            match command {
                List => "profile list".to_string(),
                Show { name } => format!("profile show {}", name.as_deref().unwrap_or("<default>")),
                Set { name, .. } => format!("profile set {} [credentials redacted]", name),
                Remove { name } => format!("profile remove {}", name),
            }
        }
        Commands::Version => "version".to_string(),
        Commands::Completions { shell } => format!("completions {:?}", shell),
    }
}
