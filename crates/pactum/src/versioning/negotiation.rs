use super::error::VersioningError;
use super::registry::{describe_versions, ApiVersion, VersionDescriptor};
use super::shaper::shape;
use axum::body::{Body, HttpBody};
use axum::extract::Request;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

pub const API_VERSION_HEADER: &str = "api-version";
const DEPRECATION_HEADER: &str = "deprecation";
const SUNSET_HEADER: &str = "sunset";

const MAX_SHAPED_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Wraps `router` so its JSON responses are shaped for the caller's `api-version`.
pub fn versioned<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn(negotiate_version))
}

/// Registry listing at `/api/v1/versions`.
pub fn version_router() -> Router {
    Router::new().route("/api/v1/versions", get(versions_handler))
}

#[derive(Debug, Serialize)]
pub struct VersionListing {
    pub current_version: ApiVersion,
    pub versions: Vec<VersionDescriptor>,
}

pub(crate) async fn versions_handler() -> Json<VersionListing> {
    Json(VersionListing {
        current_version: ApiVersion::current(),
        versions: describe_versions(),
    })
}

pub async fn negotiate_version(request: Request, next: Next) -> Response {
    let version = match requested_version(request.headers()) {
        Ok(version) => version,
        Err(error) => return unsupported_version_response(&error),
    };

    let response = next.run(request).await;
    shape_response(response, version).await
}

/// Missing header means the caller gets the current version.
pub fn requested_version(headers: &HeaderMap) -> Result<ApiVersion, VersioningError> {
    match headers.get(API_VERSION_HEADER) {
        None => Ok(ApiVersion::current()),
        Some(raw) => match raw.to_str() {
            Ok(candidate) => candidate.parse(),
            Err(_) => Err(VersioningError::unsupported("<non-ascii header>")),
        },
    }
}

fn unsupported_version_response(error: &VersioningError) -> Response {
    let supported = match error {
        VersioningError::UnsupportedVersion { supported, .. } => supported.clone(),
        _ => Vec::new(),
    };
    let payload = json!({
        "error": error.to_string(),
        "supported_versions": supported,
    });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

async fn shape_response(response: Response, version: ApiVersion) -> Response {
    let (mut parts, body) = response.into_parts();
    annotate_version_headers(&mut parts.headers, version);

    let is_json = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if !parts.status.is_success() || !is_json {
        return Response::from_parts(parts, body);
    }

    let declared_len = body.size_hint().lower();
    if declared_len > MAX_SHAPED_BODY_BYTES as u64 {
        warn!(
            bytes = declared_len,
            api_version = %version,
            "response too large to shape, passing through unshaped"
        );
        return Response::from_parts(parts, body);
    }

    let bytes = match axum::body::to_bytes(body, MAX_SHAPED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(error) => {
            warn!(%error, api_version = %version, "unable to buffer response for shaping");
            let payload = json!({ "error": "response could not be shaped for the requested API version" });
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response();
        }
    };

    let shaped = match serde_json::from_slice::<Value>(&bytes) {
        Ok(payload) => serde_json::to_vec(&shape(&payload, version)),
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };

    match shaped {
        Ok(encoded) => {
            parts.headers.remove(CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(encoded))
        }
        Err(error) => {
            warn!(%error, api_version = %version, "failed to encode shaped response");
            Response::from_parts(parts, Body::from(bytes))
        }
    }
}

fn annotate_version_headers(headers: &mut HeaderMap, version: ApiVersion) {
    headers.insert(API_VERSION_HEADER, HeaderValue::from_static(version.as_str()));

    if let Some(notice) = version.deprecation() {
        headers.insert(DEPRECATION_HEADER, HeaderValue::from_static("true"));
        if let Ok(sunset) = HeaderValue::from_str(&notice.sunset_on.to_string()) {
            headers.insert(SUNSET_HEADER, sunset);
        }
    }
}
