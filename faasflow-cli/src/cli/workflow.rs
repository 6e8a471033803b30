//! Workflow CLI arguments

use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// State machine definition file (JSON, or YAML for .yaml/.yml)
    pub definition: PathBuf,

    /// Run input given inline
    #[arg(short, long, conflicts_with = "input")]
    pub data: Option<String>,

    /// Read the run input from a file instead of stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Gateway URL starting with http(s)://
    #[arg(short, long)]
    pub gateway: Option<String>,

    /// Namespace appended to every function name
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Content-Type header sent with each invocation
    #[arg(long)]
    pub content_type: Option<String>,

    /// Query parameter (KEY=VALUE), repeatable
    #[arg(short, long = "query")]
    pub query: Vec<String>,

    /// Request header (KEY=VALUE), repeatable
    #[arg(short = 'H', long = "header")]
    pub header: Vec<String>,

    /// Use the asynchronous invocation endpoint
    #[arg(short = 'a', long = "async")]
    pub is_async: bool,

    /// HTTP method used for invocations
    #[arg(short, long)]
    pub method: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub tls_no_verify: bool,

    /// Abort after evaluating this many states
    #[arg(long)]
    pub max_steps: Option<u64>,

    /// Collect responses and print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}
