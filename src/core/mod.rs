pub mod batch;
pub mod harness;
pub mod info;
pub mod module;
pub mod registry;
pub mod report;

pub use crate::domain::model::{Direction, ParameterDescriptor, Value};
pub use crate::domain::ports::{Command, FaultReporter, Module};
pub use crate::utils::error::Result;
