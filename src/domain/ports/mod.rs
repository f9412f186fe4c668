//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters must implement:
//! - PlanRepository: Plan storage and the materialized-occurrence history
//! - WorkOrderService: Creation of work orders for due occurrences
//!
//! These traits keep the recurrence engine independent of storage and of the
//! work-order system.

pub mod plan_repository;
pub mod work_order_service;

pub use plan_repository::{PlanFilter, PlanRepository};
pub use work_order_service::WorkOrderService;
