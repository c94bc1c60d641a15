use crate::utils::error::Result;
use crate::utils::validation::{validate_path, validate_required_field, Validate};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "command-module")]
#[command(about = "Run batches of commands through the module runtime")]
pub struct CliConfig {
    /// Batch configuration file (TOML)
    pub config: Option<PathBuf>,

    #[arg(long, help = "List registered modules and exit")]
    pub list: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(long, help = "Log process CPU and memory around the batch")]
    pub monitor: bool,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if self.list {
            return Ok(());
        }
        let path = validate_required_field("config", &self.config)?;
        validate_path("config", path)
    }
}
