//! Infrastructure layer module
//!
//! Configuration loading and logging setup. Persistence adapters live in
//! [`crate::adapters`].

pub mod config;
pub mod logging;
