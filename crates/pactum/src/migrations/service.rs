use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use super::domain::{
    EndpointOutcome, EndpointResult, JobTransition, MigrationJob, MigrationJobId, MigrationOverview,
    MigrationPlan, MigrationStatus, TenantId, TransformationTest, ValidationOutcome,
};
use super::planner::{build_plan, RiskThresholds};
use super::repository::{AnalyticsError, JobStore, JobStoreError, UsageAnalytics};
use crate::versioning::shaper::CORE_FIELDS;
use crate::versioning::{
    apply_path, compatibility_matrix, deprecation_notices, resolve, validate, ApiVersion,
    MigrationPath, VersioningError,
};

/// Plans, executes, validates and rolls back tenant version migrations.
pub struct MigrationOrchestrator<S, U> {
    store: Arc<S>,
    analytics: Arc<U>,
    thresholds: RiskThresholds,
    sequence: AtomicU64,
}

impl<S, U> MigrationOrchestrator<S, U>
where
    S: JobStore + 'static,
    U: UsageAnalytics + 'static,
{
    pub fn new(store: Arc<S>, analytics: Arc<U>, thresholds: RiskThresholds) -> Self {
        Self {
            store,
            analytics,
            thresholds,
            sequence: AtomicU64::new(1),
        }
    }

    fn next_job_id(&self) -> MigrationJobId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        MigrationJobId(format!("mig-{id:06}"))
    }

    /// Checklist, impact estimate and optional rollback plan for moving `tenant` between versions.
    pub fn plan(
        &self,
        tenant: &TenantId,
        from: &str,
        to: &str,
        include_rollback: bool,
    ) -> Result<MigrationPlan, MigrationServiceError> {
        let (from, to, path) = resolve_pair(from, to)?;
        let usage = self.analytics.version_usage(tenant)?;
        Ok(build_plan(
            from,
            to,
            &path,
            &usage,
            self.thresholds,
            include_rollback,
        ))
    }

    /// Records a job and runs the migration synchronously.
    ///
    /// Sample payloads are pushed through the chain; if any of them is not an object or loses a
    /// core field the job ends `failed` and is still returned. Store errors after the job exists
    /// mark it `failed` before the error is surfaced.
    pub fn execute(
        &self,
        tenant: &TenantId,
        actor: &str,
        from: &str,
        to: &str,
        samples: &[Value],
    ) -> Result<MigrationJob, MigrationServiceError> {
        let (from, to, path) = resolve_pair(from, to)?;
        let usage = self.analytics.version_usage(tenant)?;
        let plan = build_plan(from, to, &path, &usage, self.thresholds, true);

        let now = Utc::now();
        let job = self.store.insert(MigrationJob {
            id: self.next_job_id(),
            tenant_id: tenant.clone(),
            from_version: from,
            to_version: to,
            status: MigrationStatus::InProgress,
            plan,
            results: Vec::new(),
            created_by: actor.to_string(),
            created_at: now,
            started_at: Some(now),
            completed_at: None,
            rolled_back_by: None,
            rolled_back_at: None,
            error: None,
        })?;
        info!(tenant = %tenant, job = %job.id, %from, %to, "migration started");

        let failures: Vec<String> = samples
            .iter()
            .enumerate()
            .map(|(index, sample)| run_transformation_test(index, sample, from, to, &path))
            .filter_map(|test| test.error.map(|error| format!("sample {}: {error}", test.index)))
            .collect();

        let transition = if failures.is_empty() {
            let results = usage
                .endpoints_using(from)
                .into_iter()
                .map(|(endpoint, requests_affected)| EndpointResult {
                    endpoint,
                    requests_affected,
                    steps_applied: path.len(),
                    outcome: EndpointOutcome::Migrated,
                })
                .collect();
            JobTransition::Complete {
                results,
                completed_at: Utc::now(),
            }
        } else {
            JobTransition::Fail {
                error: failures.join("; "),
                failed_at: Utc::now(),
            }
        };

        match self
            .store
            .transition(tenant, &job.id, MigrationStatus::InProgress, transition)
        {
            Ok(finished) => {
                info!(tenant = %tenant, job = %finished.id, status = %finished.status, "migration finished");
                Ok(finished)
            }
            Err(error) => {
                warn!(tenant = %tenant, job = %job.id, %error, "migration could not be completed");
                let failed = JobTransition::Fail {
                    error: error.to_string(),
                    failed_at: Utc::now(),
                };
                if let Err(mark_error) =
                    self.store
                        .transition(tenant, &job.id, MigrationStatus::InProgress, failed)
                {
                    warn!(tenant = %tenant, job = %job.id, error = %mark_error, "unable to mark migration failed");
                }
                Err(error.into())
            }
        }
    }

    /// Compatibility report plus per-sample chain runs; nothing is persisted.
    pub fn validate(
        &self,
        from: &str,
        to: &str,
        samples: &[Value],
    ) -> Result<ValidationOutcome, MigrationServiceError> {
        let (from, to, path) = resolve_pair(from, to)?;
        let report = validate(to, samples);
        let transformation_tests: Vec<TransformationTest> = samples
            .iter()
            .enumerate()
            .map(|(index, sample)| run_transformation_test(index, sample, from, to, &path))
            .collect();
        let ready = report.compatible && transformation_tests.iter().all(|test| test.success);

        Ok(ValidationOutcome {
            from_version: from,
            to_version: to,
            report,
            transformation_tests,
            ready,
        })
    }

    /// Marks a completed job rolled back. Any other status is refused.
    pub fn rollback(
        &self,
        tenant: &TenantId,
        actor: &str,
        id: &MigrationJobId,
    ) -> Result<MigrationJob, MigrationServiceError> {
        let job = self
            .store
            .fetch(tenant, id)?
            .ok_or_else(|| MigrationServiceError::JobNotFound(id.clone()))?;

        if job.status != MigrationStatus::Completed {
            return Err(MigrationServiceError::InvalidJobState {
                id: id.clone(),
                status: job.status,
            });
        }

        let transition = JobTransition::RollBack {
            actor: actor.to_string(),
            rolled_back_at: Utc::now(),
        };
        match self
            .store
            .transition(tenant, id, MigrationStatus::Completed, transition)
        {
            Ok(rolled_back) => {
                info!(tenant = %tenant, job = %id, actor, "migration rolled back");
                Ok(rolled_back)
            }
            Err(JobStoreError::StatusConflict { actual, .. }) => {
                Err(MigrationServiceError::InvalidJobState {
                    id: id.clone(),
                    status: actual,
                })
            }
            Err(JobStoreError::NotFound) => Err(MigrationServiceError::JobNotFound(id.clone())),
            Err(other) => Err(other.into()),
        }
    }

    pub fn get(
        &self,
        tenant: &TenantId,
        id: &MigrationJobId,
    ) -> Result<MigrationJob, MigrationServiceError> {
        self.store
            .fetch(tenant, id)?
            .ok_or_else(|| MigrationServiceError::JobNotFound(id.clone()))
    }

    pub fn history(&self, tenant: &TenantId) -> Result<Vec<MigrationJob>, MigrationServiceError> {
        Ok(self.store.list(tenant)?)
    }

    /// Job history, usage, deprecations and the version compatibility matrix.
    pub fn overview(&self, tenant: &TenantId) -> Result<MigrationOverview, MigrationServiceError> {
        Ok(MigrationOverview {
            current_version: ApiVersion::current(),
            migrations: self.history(tenant)?,
            usage: self.analytics.version_usage(tenant)?,
            deprecations: deprecation_notices(),
            compatibility_matrix: compatibility_matrix(),
        })
    }
}

/// Parses both versions and resolves a gap-free upgrade path between them.
fn resolve_pair(
    from: &str,
    to: &str,
) -> Result<(ApiVersion, ApiVersion, MigrationPath), VersioningError> {
    let from: ApiVersion = from.parse()?;
    let to: ApiVersion = to.parse()?;
    if from == to {
        return Err(VersioningError::IdenticalVersions { version: from });
    }

    let path = resolve(from, to);
    if !path.connects(from, to) {
        return Err(VersioningError::UnreachablePath { from, to });
    }
    Ok((from, to, path))
}

fn run_transformation_test(
    index: usize,
    sample: &Value,
    from: ApiVersion,
    to: ApiVersion,
    path: &MigrationPath,
) -> TransformationTest {
    if !sample.is_object() {
        return TransformationTest {
            index,
            success: false,
            error: Some("sample is not a JSON object".to_string()),
            output: None,
        };
    }

    let output = apply_path(sample.clone(), path);

    let lost: Vec<&str> = CORE_FIELDS
        .into_iter()
        .filter(|field| match sample.get(*field) {
            Some(original) if !original.is_null() => output.get(*field) != Some(original),
            _ => false,
        })
        .collect();

    if lost.is_empty() {
        TransformationTest {
            index,
            success: true,
            error: None,
            output: Some(output),
        }
    } else {
        TransformationTest {
            index,
            success: false,
            error: Some(format!(
                "core field(s) {} not preserved migrating {from} -> {to}",
                lost.join(", ")
            )),
            output: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationServiceError {
    #[error(transparent)]
    Versioning(#[from] VersioningError),
    #[error("migration job {0} not found")]
    JobNotFound(MigrationJobId),
    #[error("migration job {id} is {status}; only completed migrations can be rolled back")]
    InvalidJobState {
        id: MigrationJobId,
        status: MigrationStatus,
    },
    #[error(transparent)]
    Store(#[from] JobStoreError),
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
}
