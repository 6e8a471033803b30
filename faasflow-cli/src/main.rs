mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::{handlers, workflow::RunArgs, workflow_handlers};
use faasflow_core::models::LogLevel;
use faasflow_core::services::logging::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "faasflow")]
#[command(version)]
#[command(about = "Run state machines of serverless functions through a function gateway")]
#[command(
    help_template = "{name} - {version}\n{about}\n\n{usage-heading}\n  {usage}\n\n{all-args}{options}\n"
)]
struct Cli {
    /// Log level (error, warn, info, debug, trace); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a state machine definition
    ///
    /// Every state invokes the gateway function of the same name. Function
    /// responses are written to stdout as they arrive; logs go to stderr.
    ///
    /// Examples:
    ///   faasflow run trip-saga.json --data '{"trip_id": 7}'
    ///   echo yes | faasflow run approval.yaml --gateway https://gw.example.com
    ///   faasflow run flow.json --input order.json --json
    Run(RunArgs),

    /// Check a definition for dangling targets and missing transitions
    Validate {
        /// State machine definition file
        definition: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Write a faasflow configuration file
    Config {
        /// Create the configuration file with defaults
        #[arg(long)]
        init: bool,

        /// Path to configuration file (default: ~/.config/faasflow/config.toml)
        #[arg(long)]
        config_file: Option<PathBuf>,
    },
}

fn start_logging(level: LogLevel) -> Result<()> {
    init_logging(level).map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let config = handlers::load_configuration(args.config.as_deref())?;
            start_logging(cli.log_level.unwrap_or(config.log_level))?;
            workflow_handlers::handle_run(args, config).await?;
        }
        Commands::Validate { definition, json } => {
            start_logging(cli.log_level.unwrap_or_default())?;
            workflow_handlers::handle_validate(&definition, json).await?;
        }
        Commands::Config { init, config_file } => {
            start_logging(cli.log_level.unwrap_or_default())?;
            if init {
                handlers::handle_config_init(config_file).await?;
            } else {
                println!("Config command requires --init flag");
                println!("Usage: faasflow config --init [--config-file PATH]");
            }
        }
    }

    Ok(())
}
