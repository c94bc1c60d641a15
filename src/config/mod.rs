pub mod batch_config;
#[cfg(feature = "cli")]
pub mod cli;

pub use batch_config::{BatchConfig, StepConfig};
#[cfg(feature = "cli")]
pub use cli::CliConfig;
