use std::path::PathBuf;
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::debug;
use serde_json::Value;

/// Developer panel module registry and command dispatcher
#[derive(Parser, Debug)]
#[command(name = "devpanel")]
#[command(about = "Manage developer panel modules and dispatch panel commands")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output (debug level logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (error level logging only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Debug output (trace level logging)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log format: text or json
    #[arg(long, value_name = "FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Log file path for file output
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Log level for file output (independent of console level)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_file_level: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Option store file (overrides storage.options_file)
    #[arg(long, value_name = "FILE", global = true)]
    pub options_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Show every registered module and its lifecycle state
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Add a module to the enablement list and activate it
    Enable {
        name: String,
    },

    /// Remove a module from the enablement list and deactivate it
    Disable {
        name: String,
    },

    /// Dispatch a command and print the response envelope
    Dispatch {
        command: String,

        /// JSON payload passed to the handler
        #[arg(long, value_name = "JSON", default_value = "{}")]
        payload: String,

        /// Security token (defaults to auth.token from the configuration)
        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,
    },
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    let args = Args::parse();
    debug!("Parsed CLI arguments: {:?}", args);
    args
}

/// Validate CLI argument combinations
pub fn validate_args(args: &Args) -> Result<()> {
    let log_flags_count = [args.verbose, args.quiet, args.debug]
        .iter()
        .filter(|&&flag| flag)
        .count();

    if log_flags_count > 1 {
        return Err(anyhow::anyhow!(
            "Conflicting log level flags: only one of --verbose, --quiet, or --debug may be specified"
        ));
    }

    if let Some(format) = &args.log_format {
        match format.to_lowercase().as_str() {
            "text" | "json" => {}
            _ => return Err(anyhow::anyhow!("Invalid log format '{}'. Valid options: text, json", format)),
        }
    }

    if let Some(level) = &args.log_file_level {
        crate::logging::parse_log_level(level)?;
        if args.log_file.is_none() {
            return Err(anyhow::anyhow!("--log-file-level requires --log-file to be specified"));
        }
    }

    if let Commands::Dispatch { payload, .. } = &args.command {
        parse_payload(payload)?;
    }

    Ok(())
}

/// Parse a `--payload` argument; it must be a JSON object
pub fn parse_payload(payload: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| anyhow::anyhow!("Invalid --payload JSON: {}", e))?;
    if !value.is_object() {
        return Err(anyhow::anyhow!("--payload must be a JSON object"));
    }
    Ok(value)
}
