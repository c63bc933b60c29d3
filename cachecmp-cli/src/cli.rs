//! CLI argument parsing definitions

use cachecmp_config::VariantKind;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cachecmp", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Populate a caching proxy, then verify every sampled read is a cache hit
    Run {
        /// Variant preset: baseline (X-Nginx-Cache, concurrency 1) or custom (X-Cache, concurrency 100)
        #[arg(long, value_name = "VARIANT")]
        variant: Option<VariantKind>,

        /// Base URL of an already running proxy; starts an in-process proxy when absent
        #[arg(long, value_name = "URL")]
        external: Option<String>,

        #[command(flatten)]
        workload: WorkloadArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run both variants with their presets and print the reports side by side
    Compare {
        /// Base URL of a running baseline proxy; simulated in-process when absent
        #[arg(long, value_name = "URL")]
        baseline_url: Option<String>,

        #[command(flatten)]
        workload: WorkloadArgs,

        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the reference origin until interrupted
    ServeOrigin {
        /// Address to bind to
        #[arg(long, value_name = "HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, value_name = "PORT", default_value = "8081")]
        port: u16,
    },

    /// Run the reference caching proxy until interrupted
    ServeProxy {
        /// Address to bind to
        #[arg(long, value_name = "HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, value_name = "PORT", default_value = "8080")]
        port: u16,

        /// Virtual host route (repeatable)
        #[arg(long = "upstream", value_name = "HOST=URL", required = true)]
        upstreams: Vec<String>,

        /// Cache-status header to annotate responses with
        #[arg(long, value_name = "NAME", default_value = "X-Cache")]
        header: String,

        /// Maximum cached responses; unlimited when absent
        #[arg(long, value_name = "N")]
        capacity: Option<usize>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

/// Workload overrides shared by `run` and `compare`
#[derive(Args, Debug, Default)]
pub struct WorkloadArgs {
    /// Number of keys to populate
    #[arg(long, value_name = "N")]
    pub keys: Option<u64>,

    /// Total sampled requests across all workers
    #[arg(long, value_name = "N", conflicts_with = "duration")]
    pub iterations: Option<u64>,

    /// Sampling time in seconds
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Store capacity of the in-process proxy; unlimited when absent
    #[arg(long, value_name = "N")]
    pub capacity: Option<usize>,

    /// Seed for the sampler's key draws
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(long, value_name = "PATH")]
        path: PathBuf,
    },

    /// Print or write a sample configuration
    Generate {
        /// Write to this file instead of stdout
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}
