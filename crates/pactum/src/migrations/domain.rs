use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::versioning::{
    ApiVersion, CompatibilityEntry, CompatibilityReport, DeprecationNotice, MigrationStepView,
};

use super::repository::VersionUsage;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationJobId(pub String);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for MigrationJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job lifecycle: `pending -> in_progress -> {completed, failed}`, then `completed -> rolled_back`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    RolledBack,
}

impl MigrationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RolledBack => "rolled_back",
        }
    }

    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Failed)
                | (Self::Completed, Self::RolledBack)
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::RolledBack)
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactEstimate {
    pub affected_requests: u64,
    pub affected_endpoints: Vec<String>,
    pub risk: RiskTier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackPlan {
    pub target_version: ApiVersion,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub from_version: ApiVersion,
    pub to_version: ApiVersion,
    pub steps: Vec<MigrationStepView>,
    pub breaking: bool,
    pub checklist: Vec<String>,
    pub testing_recommendations: Vec<String>,
    pub impact: ImpactEstimate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_plan: Option<RollbackPlan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointOutcome {
    Migrated,
    Skipped,
}

/// Per-endpoint record written when a job completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointResult {
    pub endpoint: String,
    pub requests_affected: u64,
    pub steps_applied: usize,
    pub outcome: EndpointOutcome,
}

/// Persisted migration job. Never deleted; a rollback only changes its status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationJob {
    pub id: MigrationJobId,
    pub tenant_id: TenantId,
    pub from_version: ApiVersion,
    pub to_version: ApiVersion,
    pub status: MigrationStatus,
    pub plan: MigrationPlan,
    pub results: Vec<EndpointResult>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolled_back_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolled_back_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A status change applied by the job store after its optimistic status check.
#[derive(Debug, Clone, PartialEq)]
pub enum JobTransition {
    Complete {
        results: Vec<EndpointResult>,
        completed_at: DateTime<Utc>,
    },
    Fail {
        error: String,
        failed_at: DateTime<Utc>,
    },
    RollBack {
        actor: String,
        rolled_back_at: DateTime<Utc>,
    },
}

impl JobTransition {
    pub const fn target_status(&self) -> MigrationStatus {
        match self {
            Self::Complete { .. } => MigrationStatus::Completed,
            Self::Fail { .. } => MigrationStatus::Failed,
            Self::RollBack { .. } => MigrationStatus::RolledBack,
        }
    }

    /// Writes the transition into `job`; the caller has already checked the current status.
    pub fn apply_to(self, job: &mut MigrationJob) {
        job.status = self.target_status();
        match self {
            Self::Complete {
                results,
                completed_at,
            } => {
                job.results = results;
                job.completed_at = Some(completed_at);
            }
            Self::Fail { error, failed_at } => {
                job.error = Some(error);
                job.completed_at = Some(failed_at);
            }
            Self::RollBack {
                actor,
                rolled_back_at,
            } => {
                job.rolled_back_by = Some(actor);
                job.rolled_back_at = Some(rolled_back_at);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformationTest {
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    pub from_version: ApiVersion,
    pub to_version: ApiVersion,
    pub report: CompatibilityReport,
    pub transformation_tests: Vec<TransformationTest>,
    pub ready: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationOverview {
    pub current_version: ApiVersion,
    pub migrations: Vec<MigrationJob>,
    pub usage: VersionUsage,
    pub deprecations: Vec<DeprecationNotice>,
    pub compatibility_matrix: Vec<CompatibilityEntry>,
}
