use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::{json, Value};

use crate::migrations::domain::{
    JobTransition, MigrationJob, MigrationJobId, MigrationStatus, TenantId,
};
use crate::migrations::repository::{
    AnalyticsError, JobStore, JobStoreError, UsageAnalytics, VersionUsage,
};
use crate::migrations::{migration_router, MigrationOrchestrator, RiskThresholds};

pub(super) fn tenant() -> TenantId {
    TenantId("acme".to_string())
}

pub(super) fn other_tenant() -> TenantId {
    TenantId("globex".to_string())
}

pub(super) fn usage() -> VersionUsage {
    VersionUsage::default()
        .with("/api/v1/contracts", "1.0", 9_000)
        .with("/api/v1/signatures", "1.0", 3_000)
        .with("/api/v1/contracts", "1.1", 400)
        .with("/api/v1/contracts", "2.0", 2_500)
}

pub(super) fn contract_sample() -> Value {
    json!({
        "id": "ctr-1001",
        "name": "Master Services Agreement",
        "status": "active",
        "pagination": {"page": 2, "limit": 25, "total": 60},
    })
}

pub(super) fn build_orchestrator() -> (
    MigrationOrchestrator<MemoryJobStore, StaticAnalytics>,
    Arc<MemoryJobStore>,
) {
    let store = Arc::new(MemoryJobStore::default());
    let orchestrator = MigrationOrchestrator::new(
        store.clone(),
        Arc::new(StaticAnalytics(usage())),
        RiskThresholds::default(),
    );
    (orchestrator, store)
}

pub(super) fn migration_router_with_orchestrator(
    orchestrator: MigrationOrchestrator<MemoryJobStore, StaticAnalytics>,
) -> axum::Router {
    migration_router(Arc::new(orchestrator))
}

#[derive(Default, Clone)]
pub(super) struct MemoryJobStore {
    pub(super) jobs: Arc<Mutex<Vec<MigrationJob>>>,
}

impl JobStore for MemoryJobStore {
    fn insert(&self, job: MigrationJob) -> Result<MigrationJob, JobStoreError> {
        let mut guard = self.jobs.lock().expect("job store mutex poisoned");
        if guard.iter().any(|existing| existing.id == job.id) {
            return Err(JobStoreError::Conflict);
        }
        guard.push(job.clone());
        Ok(job)
    }

    fn fetch(
        &self,
        tenant: &TenantId,
        id: &MigrationJobId,
    ) -> Result<Option<MigrationJob>, JobStoreError> {
        let guard = self.jobs.lock().expect("job store mutex poisoned");
        Ok(guard
            .iter()
            .find(|job| &job.tenant_id == tenant && &job.id == id)
            .cloned())
    }

    fn transition(
        &self,
        tenant: &TenantId,
        id: &MigrationJobId,
        expected: MigrationStatus,
        transition: JobTransition,
    ) -> Result<MigrationJob, JobStoreError> {
        let mut guard = self.jobs.lock().expect("job store mutex poisoned");
        let job = guard
            .iter_mut()
            .find(|job| &job.tenant_id == tenant && &job.id == id)
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
        let guard = self.jobs.lock().expect("job store mutex poisoned");
        Ok(guard
            .iter()
            .rev()
            .filter(|job| &job.tenant_id == tenant)
            .cloned()
            .collect())
    }
}

/// Accepts inserts but refuses to record completions, so failure handling can be observed.
#[derive(Default, Clone)]
pub(super) struct CompletionFailingStore {
    pub(super) inner: MemoryJobStore,
}

impl JobStore for CompletionFailingStore {
    fn insert(&self, job: MigrationJob) -> Result<MigrationJob, JobStoreError> {
        self.inner.insert(job)
    }

    fn fetch(
        &self,
        tenant: &TenantId,
        id: &MigrationJobId,
    ) -> Result<Option<MigrationJob>, JobStoreError> {
        self.inner.fetch(tenant, id)
    }

    fn transition(
        &self,
        tenant: &TenantId,
        id: &MigrationJobId,
        expected: MigrationStatus,
        transition: JobTransition,
    ) -> Result<MigrationJob, JobStoreError> {
        if transition.target_status() == MigrationStatus::Completed {
            return Err(JobStoreError::Unavailable("write timeout".to_string()));
        }
        self.inner.transition(tenant, id, expected, transition)
    }

    fn list(&self, tenant: &TenantId) -> Result<Vec<MigrationJob>, JobStoreError> {
        self.inner.list(tenant)
    }
}

/// What another writer does to the job between the orchestrator's read and its rollback write.
#[derive(Clone, Copy)]
pub(super) enum Interleaving {
    RolledBackElsewhere,
    Removed,
}

/// Lets `fetch` see the job as stored, then applies a competing write before a rollback lands.
pub(super) struct InterleavedRollbackStore {
    pub(super) inner: MemoryJobStore,
    pub(super) interleaving: Interleaving,
}

impl JobStore for InterleavedRollbackStore {
    fn insert(&self, job: MigrationJob) -> Result<MigrationJob, JobStoreError> {
        self.inner.insert(job)
    }

    fn fetch(
        &self,
        tenant: &TenantId,
        id: &MigrationJobId,
    ) -> Result<Option<MigrationJob>, JobStoreError> {
        self.inner.fetch(tenant, id)
    }

    fn transition(
        &self,
        tenant: &TenantId,
        id: &MigrationJobId,
        expected: MigrationStatus,
        transition: JobTransition,
    ) -> Result<MigrationJob, JobStoreError> {
        if transition.target_status() == MigrationStatus::RolledBack {
            match self.interleaving {
                Interleaving::RolledBackElsewhere => {
                    let competing = JobTransition::RollBack {
                        actor: "other@acme".to_string(),
                        rolled_back_at: chrono::Utc::now(),
                    };
                    self.inner
                        .transition(tenant, id, MigrationStatus::Completed, competing)?;
                }
                Interleaving::Removed => {
                    let mut guard = self.inner.jobs.lock().expect("job store mutex poisoned");
                    guard.retain(|job| !(&job.tenant_id == tenant && &job.id == id));
                }
            }
        }
        self.inner.transition(tenant, id, expected, transition)
    }

    fn list(&self, tenant: &TenantId) -> Result<Vec<MigrationJob>, JobStoreError> {
        self.inner.list(tenant)
    }
}

pub(super) struct UnavailableJobStore;

impl JobStore for UnavailableJobStore {
    fn insert(&self, _job: MigrationJob) -> Result<MigrationJob, JobStoreError> {
        Err(JobStoreError::Unavailable("database offline".to_string()))
    }

    fn fetch(
        &self,
        _tenant: &TenantId,
        _id: &MigrationJobId,
    ) -> Result<Option<MigrationJob>, JobStoreError> {
        Err(JobStoreError::Unavailable("database offline".to_string()))
    }

    fn transition(
        &self,
        _tenant: &TenantId,
        _id: &MigrationJobId,
        _expected: MigrationStatus,
        _transition: JobTransition,
    ) -> Result<MigrationJob, JobStoreError> {
        Err(JobStoreError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _tenant: &TenantId) -> Result<Vec<MigrationJob>, JobStoreError> {
        Err(JobStoreError::Unavailable("database offline".to_string()))
    }
}

/// Serves the same usage to every tenant.
pub(super) struct StaticAnalytics(pub(super) VersionUsage);

impl UsageAnalytics for StaticAnalytics {
    fn version_usage(&self, _tenant: &TenantId) -> Result<VersionUsage, AnalyticsError> {
        Ok(self.0.clone())
    }
}

pub(super) struct UnavailableAnalytics;

impl UsageAnalytics for UnavailableAnalytics {
    fn version_usage(&self, _tenant: &TenantId) -> Result<VersionUsage, AnalyticsError> {
        Err(AnalyticsError::Unavailable("warehouse offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
