//! stylemix CLI library
//!
//! Exposes the command implementations so they can be driven from
//! integration tests as well as from the `stylemix` binary.

pub mod cli_args;
pub mod commands;
pub mod dispatch;
pub mod input;
pub mod logging;
