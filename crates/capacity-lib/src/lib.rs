//! Storage capacity rollup library
//!
//! This crate provides:
//! - Tenant resolution and the All Storage → system → tenant → pool hierarchy
//! - Simple and weighted utilization averages per grouping
//! - Pool forecasts, alerts and recommendations
//! - Record sources that feed the engine
//! - Health checks and observability

pub mod alerts;
pub mod averaging;
pub mod config;
pub mod engine;
pub mod forecast;
pub mod health;
pub mod hierarchy;
pub mod kpis;
pub mod models;
pub mod observability;
pub mod quality;
pub mod source;
pub mod tenant;
pub mod units;

pub use config::EngineConfig;
pub use engine::CapacityEngine;
pub use health::{
    Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse,
    ReadinessResponse,
};
pub use hierarchy::{HierarchyIndex, HierarchyViolation};
pub use models::*;
pub use observability::{ReportMetrics, StructuredLogger};
pub use quality::DataQualityWarning;
pub use source::{InMemorySource, JsonSnapshotSource, RecordSource, SourceError};
pub use tenant::{TenantAssignment, TenantResolver};
