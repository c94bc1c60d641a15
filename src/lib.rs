pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::{BatchConfig, StepConfig};

pub use crate::core::{
    batch::{BatchRunner, StepResult, StepStatus},
    harness::ModuleRunner,
    info::{Capabilities, ModuleInfo, ModuleInfoBuilder},
    module::CommandModule,
    registry::{ModuleFactory, ModuleRegistry},
    report::{RecordingReporter, TracingReporter},
};
pub use crate::domain::model::{Direction, FieldRef, ParameterDescriptor, ParameterSummary, Value};
pub use crate::domain::ports::{Cancelable, Command, FaultReporter, Module, Previewable};
pub use crate::utils::error::{ModuleError, Result};
