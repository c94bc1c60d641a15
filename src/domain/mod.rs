// Domain layer: parameter metadata and the command / module ports.

pub mod model;
pub mod ports;
