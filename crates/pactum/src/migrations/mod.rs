//! Tenant-initiated API version migrations.
//!
//! The orchestrator plans, executes, validates and rolls back moves between registry versions.
//! Job persistence and usage analytics sit behind the `JobStore` and `UsageAnalytics` traits so
//! the service binary and the tests can supply their own implementations.

pub mod analytics;
pub mod domain;
pub mod planner;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use analytics::CsvUsageAnalytics;
pub use domain::{
    EndpointOutcome, EndpointResult, ImpactEstimate, JobTransition, MigrationJob, MigrationJobId,
    MigrationOverview, MigrationPlan, MigrationStatus, RiskTier, RollbackPlan, TenantId,
    TransformationTest, ValidationOutcome,
};
pub use planner::RiskThresholds;
pub use repository::{AnalyticsError, JobStore, JobStoreError, UsageAnalytics, VersionUsage};
pub use router::{
    migration_router, MigrationActionRequest, MigrationRequest, MigrationType, TENANT_HEADER,
    USER_HEADER,
};
pub use service::{MigrationOrchestrator, MigrationServiceError};
