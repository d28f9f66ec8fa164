use super::error::VersioningError;
use super::registry::ApiVersion;
use super::resolver::{resolve, MigrationPath};
use serde_json::Value;

/// Moves a payload from `from` to `to`, folding each step's output into the next.
///
/// Identical versions hand the payload back untouched. Pairs with no catalogued path
/// (downgrades) also return it unchanged; use [`try_apply_chain`] to detect that case.
pub fn apply_chain(payload: Value, from: ApiVersion, to: ApiVersion) -> Value {
    if from == to {
        return payload;
    }
    apply_path(payload, &resolve(from, to))
}

pub fn try_apply_chain(
    payload: Value,
    from: ApiVersion,
    to: ApiVersion,
) -> Result<Value, VersioningError> {
    if from == to {
        return Ok(payload);
    }

    let path = resolve(from, to);
    if !path.connects(from, to) {
        return Err(VersioningError::UnreachablePath { from, to });
    }
    Ok(apply_path(payload, &path))
}

pub fn apply_path(payload: Value, path: &MigrationPath) -> Value {
    path.steps()
        .iter()
        .fold(payload, |current, step| step.apply(current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::versioning::shaper::VERSION_INFO;
    use serde_json::json;

    fn samples() -> Vec<Value> {
        vec![
            Value::Null,
            json!(3),
            json!("contract"),
            json!([1, 2, 3]),
            json!({}),
            json!({ "id": "1", "name": "a" }),
            json!({
                "id": "c-1",
                "name": "Master Services Agreement",
                "status": "signed",
                "enhanced_analytics": { "views": 12 },
                "advanced_permissions": { "can_sign": true },
                "pagination": { "page": 2, "limit": 10, "total": 45 },
                "data": [{ "id": "l-1", "name": "line", "enhanced_analytics": {} }],
                "archived_at": null,
            }),
        ]
    }

    fn strip_timestamp(mut value: Value) -> Value {
        if let Some(Value::Object(info)) = value.get_mut(VERSION_INFO) {
            info.remove("generated_at");
        }
        value
    }

    #[test]
    fn identity_returns_the_input_exactly() {
        for version in ApiVersion::ordered() {
            for sample in samples() {
                assert_eq!(apply_chain(sample.clone(), version, version), sample);
                assert_eq!(
                    try_apply_chain(sample.clone(), version, version).expect("identity"),
                    sample
                );
            }
        }
    }

    #[test]
    fn chains_compose_transitively() {
        let versions = ApiVersion::ordered();
        for (ai, &a) in versions.iter().enumerate() {
            for (bi, &b) in versions.iter().enumerate().skip(ai) {
                for &c in versions.iter().skip(bi) {
                    for sample in samples() {
                        let stepwise = apply_chain(apply_chain(sample.clone(), a, b), b, c);
                        let direct = apply_chain(sample.clone(), a, c);
                        assert_eq!(
                            strip_timestamp(stepwise),
                            strip_timestamp(direct),
                            "{a} -> {b} -> {c}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn chains_preserve_core_fields() {
        let sample = json!({ "id": "c-1", "name": "MSA", "enhanced_analytics": { "views": 1 } });
        for from in ApiVersion::ordered() {
            for to in ApiVersion::ordered() {
                let migrated = apply_chain(sample.clone(), from, to);
                assert_eq!(migrated["id"], json!("c-1"));
                assert_eq!(migrated["name"], json!("MSA"));
            }
        }
    }

    #[test]
    fn full_upgrade_lands_in_the_enhanced_shape() {
        let legacy = json!({
            "id": "c-1",
            "name": "MSA",
            "pagination": { "page": 1, "limit": 20, "total": 45 },
        });

        let upgraded = apply_chain(legacy, ApiVersion::V1_0, ApiVersion::V2_0);

        assert_eq!(upgraded[VERSION_INFO]["api_version"], json!("2.0"));
        assert_eq!(
            upgraded["pagination"],
            json!({
                "current_page": 1,
                "per_page": 20,
                "total_items": 45,
                "total_pages": 3,
                "has_next": true,
                "has_previous": false,
            })
        );
    }

    #[test]
    fn downgrades_leave_payload_unchanged_but_fail_when_checked() {
        let sample = json!({ "id": "1", "version_info": { "api_version": "2.0" } });

        assert_eq!(
            apply_chain(sample.clone(), ApiVersion::V2_0, ApiVersion::V1_0),
            sample
        );
        assert_eq!(
            try_apply_chain(sample, ApiVersion::V2_0, ApiVersion::V1_0),
            Err(VersioningError::UnreachablePath {
                from: ApiVersion::V2_0,
                to: ApiVersion::V1_0,
            })
        );
    }
}
