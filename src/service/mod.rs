//! Service layer

pub mod plan_service;
pub mod types;

pub use plan_service::PlanService;
