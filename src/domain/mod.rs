//! Domain layer for the Upkeep maintenance planner
//!
//! This module contains the frequency model, plans, work orders and the
//! port traits that storage adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
