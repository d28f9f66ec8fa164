use super::registry::ApiVersion;
use super::shaper::{hidden_fields, shape, CORE_FIELDS, PAGINATION};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityIssue {
    pub severity: IssueSeverity,
    pub sample_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompatibilityReport {
    pub target_version: ApiVersion,
    pub compatible: bool,
    pub samples_checked: usize,
    pub issues: Vec<CompatibilityIssue>,
}

impl CompatibilityReport {
    pub fn highest_severity(&self) -> Option<IssueSeverity> {
        self.issues.iter().map(|issue| issue.severity).max()
    }

    pub fn count(&self, severity: IssueSeverity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }
}

/// Shapes each sample for `target` and reports structural deltas.
///
/// The report is compatible as long as no high-severity issue was found.
pub fn validate(target: ApiVersion, samples: &[Value]) -> CompatibilityReport {
    let mut issues = Vec::new();

    for (index, sample) in samples.iter().enumerate() {
        let shaped = shape(sample, target);
        inspect_sample(index, sample, &shaped, target, &mut issues);
    }

    let compatible = !issues
        .iter()
        .any(|issue| issue.severity == IssueSeverity::High);

    CompatibilityReport {
        target_version: target,
        compatible,
        samples_checked: samples.len(),
        issues,
    }
}

fn inspect_sample(
    index: usize,
    sample: &Value,
    shaped: &Value,
    target: ApiVersion,
    issues: &mut Vec<CompatibilityIssue>,
) {
    let mut report = |severity, field: Option<&str>, message: String| {
        issues.push(CompatibilityIssue {
            severity,
            sample_index: index,
            field: field.map(str::to_string),
            message,
        });
    };

    let (Value::Object(before), Value::Object(after)) = (sample, shaped) else {
        report(
            IssueSeverity::Medium,
            None,
            format!(
                "sample is a JSON {} rather than an object; API {target} passes it through unshaped",
                json_kind(sample)
            ),
        );
        return;
    };

    for field in CORE_FIELDS {
        if before.get(field).map_or(true, Value::is_null) {
            let severity = if field == "id" {
                IssueSeverity::High
            } else {
                IssueSeverity::Medium
            };
            report(
                severity,
                Some(field),
                format!("required field '{field}' is missing"),
            );
        }
    }

    let hidden = hidden_fields(target);
    for (key, value) in before {
        match after.get(key) {
            None if value.is_null() => report(
                IssueSeverity::Low,
                Some(key.as_str()),
                format!("null field '{key}' is omitted from API {target} responses"),
            ),
            None if hidden.contains(&key.as_str()) => report(
                IssueSeverity::Low,
                Some(key.as_str()),
                format!("field '{key}' is not exposed in API {target}"),
            ),
            None => report(
                IssueSeverity::Medium,
                Some(key.as_str()),
                format!("field '{key}' is dropped when shaping for API {target}"),
            ),
            Some(shaped_value) if json_kind(value) != json_kind(shaped_value) => report(
                IssueSeverity::High,
                Some(key.as_str()),
                format!(
                    "field '{key}' changes type from {} to {}",
                    json_kind(value),
                    json_kind(shaped_value)
                ),
            ),
            Some(shaped_value) if CORE_FIELDS.contains(&key.as_str()) && value != shaped_value => {
                report(
                    IssueSeverity::High,
                    Some(key.as_str()),
                    format!("core field '{key}' is altered by shaping"),
                )
            }
            Some(Value::Object(shaped_pagination)) if key == PAGINATION => {
                if let Value::Object(pagination) = value {
                    if let Some(message) = pagination_delta(pagination, shaped_pagination) {
                        report(IssueSeverity::Medium, Some(key.as_str()), message);
                    }
                }
            }
            Some(_) => {}
        }
    }
}

fn pagination_delta(before: &Map<String, Value>, after: &Map<String, Value>) -> Option<String> {
    let before_keys: BTreeSet<&str> = before.keys().map(String::as_str).collect();
    let after_keys: BTreeSet<&str> = after.keys().map(String::as_str).collect();
    if before_keys == after_keys {
        return None;
    }

    let removed: Vec<&str> = before_keys.difference(&after_keys).copied().collect();
    let added: Vec<&str> = after_keys.difference(&before_keys).copied().collect();
    Some(format!(
        "pagination fields change (removed: [{}], added: [{}])",
        removed.join(", "),
        added.join(", ")
    ))
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_samples_are_compatible_without_issues() {
        let report = validate(
            ApiVersion::V2_0,
            &[json!({ "id": "1", "name": "a", "status": "draft" })],
        );

        assert!(report.compatible);
        assert!(report.issues.is_empty());
        assert_eq!(report.samples_checked, 1);
        assert_eq!(report.highest_severity(), None);
    }

    #[test]
    fn hidden_extensions_are_low_severity() {
        let report = validate(
            ApiVersion::V1_0,
            &[json!({ "id": "1", "name": "a", "enhanced_analytics": { "views": 5 } })],
        );

        assert!(report.compatible);
        assert_eq!(report.count(IssueSeverity::Low), 1);
        assert_eq!(report.issues[0].field.as_deref(), Some("enhanced_analytics"));
    }

    #[test]
    fn missing_id_makes_the_report_incompatible() {
        let report = validate(ApiVersion::V1_1, &[json!({ "name": "orphan" })]);

        assert!(!report.compatible);
        assert_eq!(report.highest_severity(), Some(IssueSeverity::High));
        assert_eq!(report.issues[0].field.as_deref(), Some("id"));
    }

    #[test]
    fn missing_name_is_medium() {
        let report = validate(ApiVersion::V1_1, &[json!({ "id": "1" })]);

        assert!(report.compatible);
        assert_eq!(report.count(IssueSeverity::Medium), 1);
    }

    #[test]
    fn non_object_samples_are_flagged_but_not_blocking() {
        let report = validate(ApiVersion::V1_0, &[json!([1, 2]), Value::Null]);

        assert!(report.compatible);
        assert_eq!(report.count(IssueSeverity::Medium), 2);
        assert_eq!(report.issues[1].sample_index, 1);
        assert!(report.issues[0].message.contains("array"));
    }

    #[test]
    fn pagination_renames_are_reported() {
        let report = validate(
            ApiVersion::V1_0,
            &[json!({
                "id": "1",
                "name": "a",
                "pagination": { "current_page": 2, "per_page": 10, "total_items": 30 },
            })],
        );

        let issue = report
            .issues
            .iter()
            .find(|issue| issue.field.as_deref() == Some("pagination"))
            .expect("pagination issue");
        assert_eq!(issue.severity, IssueSeverity::Medium);
        assert!(issue.message.contains("current_page"));
        assert!(issue.message.contains("limit"));
    }

    #[test]
    fn null_fields_are_low_severity() {
        let report = validate(
            ApiVersion::V2_0,
            &[json!({ "id": "1", "name": "a", "archived_at": null })],
        );

        assert!(report.compatible);
        assert_eq!(report.count(IssueSeverity::Low), 1);
    }

    #[test]
    fn empty_sample_set_is_trivially_compatible() {
        let report = validate(ApiVersion::V1_0, &[]);
        assert!(report.compatible);
        assert_eq!(report.samples_checked, 0);
    }
}
