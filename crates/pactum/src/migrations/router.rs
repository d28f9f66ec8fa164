use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::domain::{MigrationJobId, TenantId};
use super::repository::{JobStore, UsageAnalytics};
use super::service::{MigrationOrchestrator, MigrationServiceError};
use crate::versioning::VersioningError;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";
const ANONYMOUS_ACTOR: &str = "anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationType {
    Plan,
    Execute,
    Validate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRequest {
    pub from_version: String,
    pub to_version: String,
    pub migration_type: MigrationType,
    #[serde(default)]
    pub test_data: Vec<Value>,
    #[serde(default)]
    pub rollback_plan: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationActionRequest {
    pub action: String,
    pub migration_id: String,
}

/// Router builder exposing tenant migration planning, execution and rollback.
pub fn migration_router<S, U>(orchestrator: Arc<MigrationOrchestrator<S, U>>) -> Router
where
    S: JobStore + 'static,
    U: UsageAnalytics + 'static,
{
    Router::new()
        .route(
            "/api/v1/version/migrate",
            get(overview_handler::<S, U>)
                .post(migrate_handler::<S, U>)
                .put(action_handler::<S, U>),
        )
        .with_state(orchestrator)
}

pub(crate) async fn migrate_handler<S, U>(
    State(orchestrator): State<Arc<MigrationOrchestrator<S, U>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<MigrationRequest>,
) -> Response
where
    S: JobStore + 'static,
    U: UsageAnalytics + 'static,
{
    let tenant = match tenant_from(&headers) {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };
    let from = request.from_version.as_str();
    let to = request.to_version.as_str();

    match request.migration_type {
        MigrationType::Plan => {
            match orchestrator.plan(&tenant, from, to, request.rollback_plan) {
                Ok(plan) => {
                    let payload = json!({
                        "migration_type": request.migration_type,
                        "plan": plan,
                    });
                    (StatusCode::OK, axum::Json(payload)).into_response()
                }
                Err(error) => error_response(error),
            }
        }
        MigrationType::Execute => {
            let actor = actor_from(&headers);
            match orchestrator.execute(&tenant, &actor, from, to, &request.test_data) {
                Ok(job) => {
                    let payload = json!({
                        "migration_type": request.migration_type,
                        "migration": job,
                    });
                    (StatusCode::CREATED, axum::Json(payload)).into_response()
                }
                Err(error) => error_response(error),
            }
        }
        MigrationType::Validate => match orchestrator.validate(from, to, &request.test_data) {
            Ok(outcome) => {
                let payload = json!({
                    "migration_type": request.migration_type,
                    "validation": outcome,
                });
                (StatusCode::OK, axum::Json(payload)).into_response()
            }
            Err(error) => error_response(error),
        },
    }
}

pub(crate) async fn overview_handler<S, U>(
    State(orchestrator): State<Arc<MigrationOrchestrator<S, U>>>,
    headers: HeaderMap,
) -> Response
where
    S: JobStore + 'static,
    U: UsageAnalytics + 'static,
{
    let tenant = match tenant_from(&headers) {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };

    match orchestrator.overview(&tenant) {
        Ok(overview) => (StatusCode::OK, axum::Json(overview)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn action_handler<S, U>(
    State(orchestrator): State<Arc<MigrationOrchestrator<S, U>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<MigrationActionRequest>,
) -> Response
where
    S: JobStore + 'static,
    U: UsageAnalytics + 'static,
{
    let tenant = match tenant_from(&headers) {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };

    if request.action != "rollback" {
        let payload = json!({
            "error": format!("unknown migration action '{}'", request.action),
            "supported_actions": ["rollback"],
        });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    }

    let actor = actor_from(&headers);
    let id = MigrationJobId(request.migration_id);
    match orchestrator.rollback(&tenant, &actor, &id) {
        Ok(job) => {
            let payload = json!({
                "action": request.action,
                "migration": job,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

fn tenant_from(headers: &HeaderMap) -> Result<TenantId, Response> {
    headers
        .get(TENANT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| TenantId(value.to_string()))
        .ok_or_else(|| {
            let payload = json!({
                "error": format!("missing {TENANT_HEADER} header"),
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        })
}

fn actor_from(headers: &HeaderMap) -> String {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(ANONYMOUS_ACTOR)
        .to_string()
}

fn error_response(error: MigrationServiceError) -> Response {
    match error {
        MigrationServiceError::Versioning(VersioningError::UnsupportedVersion {
            candidate,
            supported,
        }) => {
            let payload = json!({
                "error": format!("unsupported API version '{candidate}'"),
                "supported_versions": supported,
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        MigrationServiceError::Versioning(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        MigrationServiceError::JobNotFound(id) => {
            let payload = json!({
                "error": "migration not found",
                "migration_id": id,
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        MigrationServiceError::InvalidJobState { id, status } => {
            let payload = json!({
                "error": "only completed migrations can be rolled back",
                "migration_id": id,
                "status": status,
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        other => {
            tracing::error!(error = %other, "migration request failed");
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
