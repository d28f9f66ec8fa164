//! Per-version response shaping.
//!
//! Every version owns one shaping function, dispatched through [`SHAPERS`] by registry index.
//! Shaping only restructures JSON objects; any other payload passes through untouched.

use super::registry::ApiVersion;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};

pub const ENHANCED_ANALYTICS: &str = "enhanced_analytics";
pub const ADVANCED_PERMISSIONS: &str = "advanced_permissions";
pub const VERSION_INFO: &str = "version_info";
pub const PAGINATION: &str = "pagination";
const DATA: &str = "data";

/// Fields every version exposes unchanged.
pub const CORE_FIELDS: [&str; 2] = ["id", "name"];

pub const DEFAULT_PAGE_SIZE: u64 = 20;

type Record = Map<String, Value>;
type ShapeFn = fn(Record) -> Record;

const SHAPERS: [ShapeFn; 3] = [shape_legacy, shape_standard, shape_enhanced];

/// Fields introduced after `version`, which consumers pinned to it never see.
pub const fn hidden_fields(version: ApiVersion) -> &'static [&'static str] {
    match version {
        ApiVersion::V1_0 => &[ENHANCED_ANALYTICS, ADVANCED_PERMISSIONS, VERSION_INFO],
        ApiVersion::V1_1 => &[VERSION_INFO],
        ApiVersion::V2_0 => &[],
    }
}

pub fn shape(payload: &Value, version: ApiVersion) -> Value {
    match payload {
        Value::Object(record) => Value::Object(shape_record(record.clone(), version)),
        other => other.clone(),
    }
}

/// Owned variant used by migration steps so chains avoid re-cloning.
pub fn shape_owned(payload: Value, version: ApiVersion) -> Value {
    match payload {
        Value::Object(record) => Value::Object(shape_record(record, version)),
        other => other,
    }
}

/// Shapes for a version named by string; unknown names leave the payload as-is.
pub fn shape_for(payload: &Value, candidate: &str) -> Value {
    match ApiVersion::parse(candidate) {
        Some(version) => shape(payload, version),
        None => payload.clone(),
    }
}

fn shape_record(record: Record, version: ApiVersion) -> Record {
    let record = record
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .collect();
    SHAPERS[version.index()](record)
}

fn shape_legacy(mut record: Record) -> Record {
    strip_hidden(&mut record, ApiVersion::V1_0);
    reshape_pagination(&mut record, |window| Value::Object(window.legacy()));
    record
}

fn shape_standard(mut record: Record) -> Record {
    strip_hidden(&mut record, ApiVersion::V1_1);
    reshape_pagination(&mut record, |window| Value::Object(window.standard()));
    record
}

fn shape_enhanced(mut record: Record) -> Record {
    reshape_pagination(&mut record, |window| Value::Object(window.enhanced()));
    record.insert(VERSION_INFO.to_string(), version_info(ApiVersion::V2_0));
    record
}

fn version_info(version: ApiVersion) -> Value {
    json!({
        "api_version": version.as_str(),
        "response_format": version.response_format(),
        "generated_at": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

fn strip_hidden(record: &mut Record, version: ApiVersion) {
    let hidden = hidden_fields(version);
    for field in hidden {
        record.remove(*field);
    }

    if let Some(Value::Array(items)) = record.get_mut(DATA) {
        for item in items.iter_mut() {
            if let Value::Object(nested) = item {
                for field in hidden {
                    nested.remove(*field);
                }
            }
        }
    }
}

fn reshape_pagination(record: &mut Record, render: impl FnOnce(PageWindow) -> Value) {
    if let Some(Value::Object(pagination)) = record.get(PAGINATION) {
        let window = PageWindow::read(pagination);
        record.insert(PAGINATION.to_string(), render(window));
    }
}

/// Pagination facts read from whichever version's field names the payload carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageWindow {
    page: Option<u64>,
    per_page: Option<u64>,
    total: Option<u64>,
    total_pages: Option<u64>,
}

impl PageWindow {
    fn read(pagination: &Record) -> Self {
        Self {
            page: first_count(pagination, &["current_page", "page"]),
            per_page: first_count(pagination, &["per_page", "page_size", "limit"]),
            total: first_count(pagination, &["total_items", "total", "total_count"]),
            total_pages: first_count(pagination, &["total_pages"]),
        }
    }

    fn legacy(&self) -> Record {
        let mut fields = Record::new();
        fields.insert("page".to_string(), json!(self.page.unwrap_or(1)));
        fields.insert(
            "limit".to_string(),
            json!(self.per_page.unwrap_or(DEFAULT_PAGE_SIZE)),
        );
        fields.insert("total".to_string(), json!(self.total.unwrap_or(0)));
        fields
    }

    fn standard(&self) -> Record {
        let per_page = self
            .per_page
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let total_items = self.total.unwrap_or(0);
        let total_pages = self
            .total_pages
            .unwrap_or_else(|| total_items.div_ceil(per_page))
            .max(1);

        let mut fields = Record::new();
        fields.insert("current_page".to_string(), json!(self.current_page()));
        fields.insert("per_page".to_string(), json!(per_page));
        fields.insert("total_items".to_string(), json!(total_items));
        fields.insert("total_pages".to_string(), json!(total_pages));
        fields
    }

    fn enhanced(&self) -> Record {
        let mut fields = self.standard();
        let current_page = self.current_page();
        let total_pages = fields
            .get("total_pages")
            .and_then(Value::as_u64)
            .unwrap_or(1);
        fields.insert("has_next".to_string(), json!(current_page < total_pages));
        fields.insert("has_previous".to_string(), json!(current_page > 1));
        fields
    }

    fn current_page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }
}

fn first_count(record: &Record, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find_map(as_count)
}

fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}
