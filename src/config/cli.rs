use crate::config::RelayConfig;
use crate::utils::error::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "contact-relay")]
#[command(about = "Validate a patient contact sheet and relay its rows as webhook events")]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Validate a CSV export and send every row to the target URL
    Upload(UploadArgs),
    /// Validate a CSV export without sending anything
    Validate(ValidateArgs),
    /// Run the relay HTTP server
    Serve(ServeArgs),
}

#[derive(Debug, Clone, Args)]
pub struct UploadArgs {
    /// CSV export of the first worksheet
    pub file: PathBuf,

    /// Webhook endpoint receiving one POST per row
    #[arg(long)]
    pub target_url: Option<String>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    /// File name reported in event metadata (defaults to the input file name)
    #[arg(long)]
    pub file_name: Option<String>,

    /// Build the events and print them instead of sending
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ValidateArgs {
    pub file: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Override `server.bind`
    #[arg(long)]
    pub bind: Option<String>,
}

impl Cli {
    /// Loads the config file (or defaults) and applies command line overrides.
    pub fn load_config(&self) -> Result<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::from_file(path)?,
            None => RelayConfig::default(),
        };

        match &self.command {
            Command::Upload(args) => {
                if let Some(target_url) = &args.target_url {
                    config.upload.target_url = Some(target_url.clone());
                }
                if let Some(batch_size) = args.batch_size {
                    config.dispatch.batch_size = batch_size;
                }
            }
            Command::Serve(args) => {
                if let Some(bind) = &args.bind {
                    config.server.bind = bind.clone();
                }
            }
            Command::Validate(_) => {}
        }

        Ok(config)
    }
}
