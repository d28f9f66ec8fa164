use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{JobTransition, MigrationJob, MigrationJobId, MigrationStatus, TenantId};
use crate::versioning::ApiVersion;

/// Persistence boundary for migration jobs, always scoped by tenant.
pub trait JobStore: Send + Sync {
    fn insert(&self, job: MigrationJob) -> Result<MigrationJob, JobStoreError>;
    fn fetch(
        &self,
        tenant: &TenantId,
        id: &MigrationJobId,
    ) -> Result<Option<MigrationJob>, JobStoreError>;
    /// Applies `transition` only while the stored status still equals `expected`.
    fn transition(
        &self,
        tenant: &TenantId,
        id: &MigrationJobId,
        expected: MigrationStatus,
        transition: JobTransition,
    ) -> Result<MigrationJob, JobStoreError>;
    /// Jobs for `tenant`, newest first.
    fn list(&self, tenant: &TenantId) -> Result<Vec<MigrationJob>, JobStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    #[error("migration job already exists")]
    Conflict,
    #[error("migration job not found")]
    NotFound,
    #[error("migration job is {actual}, expected {expected}")]
    StatusConflict {
        expected: MigrationStatus,
        actual: MigrationStatus,
    },
    #[error("job store unavailable: {0}")]
    Unavailable(String),
}

/// Source of per-tenant request counts by API version.
pub trait UsageAnalytics: Send + Sync {
    fn version_usage(&self, tenant: &TenantId) -> Result<VersionUsage, AnalyticsError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("usage analytics unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read usage export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid usage export: {0}")]
    Csv(#[from] csv::Error),
}

/// Request counts keyed by version string, overall and per endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionUsage {
    pub version_breakdown: BTreeMap<String, u64>,
    pub endpoint_breakdown: BTreeMap<String, BTreeMap<String, u64>>,
}

impl VersionUsage {
    /// Adds `requests` to both breakdowns. Counts saturate at `u64::MAX`.
    pub fn record(&mut self, endpoint: &str, version: &str, requests: u64) {
        let total = self
            .version_breakdown
            .entry(version.to_string())
            .or_default();
        *total = total.saturating_add(requests);
        let per_endpoint = self
            .endpoint_breakdown
            .entry(endpoint.to_string())
            .or_default()
            .entry(version.to_string())
            .or_default();
        *per_endpoint = per_endpoint.saturating_add(requests);
    }

    pub fn with(mut self, endpoint: &str, version: &str, requests: u64) -> Self {
        self.record(endpoint, version, requests);
        self
    }

    pub fn requests_for(&self, version: ApiVersion) -> u64 {
        self.version_breakdown
            .get(version.as_str())
            .copied()
            .unwrap_or(0)
    }

    pub fn total_requests(&self) -> u64 {
        self.version_breakdown
            .values()
            .fold(0u64, |sum, count| sum.saturating_add(*count))
    }

    /// Endpoints that served `version`, busiest first.
    pub fn endpoints_using(&self, version: ApiVersion) -> Vec<(String, u64)> {
        let mut endpoints: Vec<(String, u64)> = self
            .endpoint_breakdown
            .iter()
            .filter_map(|(endpoint, versions)| {
                versions
                    .get(version.as_str())
                    .copied()
                    .filter(|count| *count > 0)
                    .map(|count| (endpoint.clone(), count))
            })
            .collect();
        endpoints.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
        endpoints
    }
}
