use crate::infra::AppState;
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use pactum::migrations::{migration_router, JobStore, MigrationOrchestrator, UsageAnalytics};
use pactum::versioning::shaper::DEFAULT_PAGE_SIZE;
use pactum::versioning::{version_router, versioned};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ContractListQuery {
    #[serde(default)]
    pub(crate) page: Option<u64>,
    #[serde(default)]
    pub(crate) per_page: Option<u64>,
}

/// Versioned API surface plus unversioned operational endpoints.
pub(crate) fn with_platform_routes<S, U>(
    orchestrator: Arc<MigrationOrchestrator<S, U>>,
) -> axum::Router
where
    S: JobStore + 'static,
    U: UsageAnalytics + 'static,
{
    let api = migration_router(orchestrator)
        .merge(version_router())
        .route("/api/v1/contracts", axum::routing::get(contracts_endpoint));

    versioned(api)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Sample contract listing in the newest response format; the negotiation layer reshapes it.
pub(crate) async fn contracts_endpoint(Query(query): Query<ContractListQuery>) -> Json<Value> {
    let contracts = sample_contracts();
    let per_page = query
        .per_page
        .filter(|size| *size > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE);
    let page = query.page.unwrap_or(1).max(1);
    let total = contracts.len() as u64;

    let start = usize::try_from((page - 1).saturating_mul(per_page)).unwrap_or(usize::MAX);
    let take = usize::try_from(per_page).unwrap_or(usize::MAX);
    let data: Vec<Value> = contracts.into_iter().skip(start).take(take).collect();

    Json(json!({
        "data": data,
        "pagination": {
            "current_page": page,
            "per_page": per_page,
            "total_items": total,
        },
        "enhanced_analytics": {
            "active_contracts": total,
            "avg_days_to_signature": 4.2,
        },
        "advanced_permissions": {
            "can_export": true,
            "can_bulk_sign": false,
        },
    }))
}

fn sample_contracts() -> Vec<Value> {
    vec![
        json!({
            "id": "ctr-1001",
            "name": "Master Services Agreement",
            "counterparty": "Initech",
            "status": "active",
            "enhanced_analytics": {"views": 58, "redlines": 3},
        }),
        json!({
            "id": "ctr-1002",
            "name": "Mutual NDA",
            "counterparty": "Globex",
            "status": "awaiting_signature",
            "advanced_permissions": {"restricted_to": ["legal"]},
        }),
        json!({
            "id": "ctr-1003",
            "name": "Reseller Agreement",
            "counterparty": "Umbrella",
            "status": "draft",
            "renewal_on": null,
        }),
    ]
}
