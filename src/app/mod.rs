pub mod commands;

pub use commands::builtin_registry;
