use metrics_exporter_prometheus::PrometheusHandle;
use pactum::error::AppError;
use pactum::migrations::{
    AnalyticsError, CsvUsageAnalytics, JobStore, JobStoreError, JobTransition, MigrationJob,
    MigrationJobId, MigrationStatus, TenantId, UsageAnalytics, VersionUsage,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

type TenantJobs = HashMap<TenantId, Vec<MigrationJob>>;

/// Jobs grouped per tenant in insertion order.
#[derive(Default, Clone)]
pub(crate) struct InMemoryJobStore {
    jobs: Arc<Mutex<TenantJobs>>,
}

impl InMemoryJobStore {
    fn lock(&self) -> Result<MutexGuard<'_, TenantJobs>, JobStoreError> {
        self.jobs
            .lock()
            .map_err(|_| JobStoreError::Unavailable("job store mutex poisoned".to_string()))
    }
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, job: MigrationJob) -> Result<MigrationJob, JobStoreError> {
        let mut guard = self.lock()?;
        let tenant_jobs = guard.entry(job.tenant_id.clone()).or_default();
        if tenant_jobs.iter().any(|existing| existing.id == job.id) {
            return Err(JobStoreError::Conflict);
        }
        tenant_jobs.push(job.clone());
        Ok(job)
    }

    fn fetch(
        &self,
        tenant: &TenantId,
        id: &MigrationJobId,
    ) -> Result<Option<MigrationJob>, JobStoreError> {
        let guard = self.lock()?;
        Ok(guard
            .get(tenant)
            .and_then(|jobs| jobs.iter().find(|job| &job.id == id))
            .cloned())
    }

    fn transition(
        &self,
        tenant: &TenantId,
        id: &MigrationJobId,
        expected: MigrationStatus,
        transition: JobTransition,
    ) -> Result<MigrationJob, JobStoreError> {
        let mut guard = self.lock()?;
        let job = guard
            .get_mut(tenant)
            .and_then(|jobs| jobs.iter_mut().find(|job| &job.id == id))
            .ok_or(JobStoreError::NotFound)?;

        if job.status != expected || !job.status.can_transition_to(transition.target_status()) {
            return Err(JobStoreError::StatusConflict {
                expected,
                actual: job.status,
            });
        }
        transition.apply_to(job);
        Ok(job.clone())
    }

    fn list(&self, tenant: &TenantId) -> Result<Vec<MigrationJob>, JobStoreError> {
        let guard = self.lock()?;
        Ok(guard
            .get(tenant)
            .map(|jobs| jobs.iter().rev().cloned().collect())
            .unwrap_or_default())
    }
}

/// Usage source chosen at startup: a CSV export when configured, seeded demo traffic otherwise.
pub(crate) enum UsageBackend {
    Csv(CsvUsageAnalytics),
    Seeded(InMemoryUsageAnalytics),
}

impl UsageBackend {
    pub(crate) fn load(usage_csv: Option<&Path>) -> Result<Self, AppError> {
        match usage_csv {
            Some(path) => {
                let analytics = CsvUsageAnalytics::from_path(path)?;
                info!(
                    path = %path.display(),
                    tenants = analytics.tenants().count(),
                    "loaded usage export"
                );
                Ok(Self::Csv(analytics))
            }
            None => Ok(Self::Seeded(InMemoryUsageAnalytics::seeded())),
        }
    }
}

impl UsageAnalytics for UsageBackend {
    fn version_usage(&self, tenant: &TenantId) -> Result<VersionUsage, AnalyticsError> {
        match self {
            Self::Csv(analytics) => analytics.version_usage(tenant),
            Self::Seeded(analytics) => analytics.version_usage(tenant),
        }
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryUsageAnalytics {
    usage: Arc<Mutex<HashMap<TenantId, VersionUsage>>>,
}

impl InMemoryUsageAnalytics {
    pub(crate) fn seeded() -> Self {
        let analytics = Self::default();
        analytics.set(
            TenantId("acme".to_string()),
            VersionUsage::default()
                .with("/api/v1/contracts", "1.0", 8_400)
                .with("/api/v1/signatures", "1.0", 2_100)
                .with("/api/v1/templates", "1.0", 310)
                .with("/api/v1/contracts", "1.1", 1_250)
                .with("/api/v1/contracts", "2.0", 5_600)
                .with("/api/v1/invoices", "2.0", 980),
        );
        analytics.set(
            TenantId("globex".to_string()),
            VersionUsage::default()
                .with("/api/v1/contracts", "1.1", 640)
                .with("/api/v1/invoices", "1.1", 120),
        );
        analytics
    }

    pub(crate) fn set(&self, tenant: TenantId, usage: VersionUsage) {
        if let Ok(mut guard) = self.usage.lock() {
            guard.insert(tenant, usage);
        }
    }
}

impl UsageAnalytics for InMemoryUsageAnalytics {
    fn version_usage(&self, tenant: &TenantId) -> Result<VersionUsage, AnalyticsError> {
        let guard = self
            .usage
            .lock()
            .map_err(|_| AnalyticsError::Unavailable("usage mutex poisoned".to_string()))?;
        Ok(guard.get(tenant).cloned().unwrap_or_default())
    }
}
