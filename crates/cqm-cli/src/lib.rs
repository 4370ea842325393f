//! Library side of the `cqm` binary.

pub mod commands;
pub mod logging;
