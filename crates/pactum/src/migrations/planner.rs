use serde::{Deserialize, Serialize};

use super::domain::{ImpactEstimate, MigrationPlan, RiskTier, RollbackPlan};
use super::repository::VersionUsage;
use crate::versioning::{ApiVersion, MigrationPath};

/// Affected-request volumes at which a migration is rated medium or high risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub medium: u64,
    pub high: u64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 1_000,
            high: 10_000,
        }
    }
}

impl RiskThresholds {
    pub fn classify(&self, affected_requests: u64) -> RiskTier {
        if affected_requests >= self.high {
            RiskTier::High
        } else if affected_requests >= self.medium {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }
}

const BUSIEST_ENDPOINTS: usize = 3;

pub(crate) fn build_plan(
    from: ApiVersion,
    to: ApiVersion,
    path: &MigrationPath,
    usage: &VersionUsage,
    thresholds: RiskThresholds,
    include_rollback: bool,
) -> MigrationPlan {
    let breaking = path.is_breaking();
    let impact = estimate_impact(from, usage, thresholds);
    let testing_recommendations = testing_recommendations(from, to, path, usage);

    MigrationPlan {
        from_version: from,
        to_version: to,
        steps: path.views(),
        breaking,
        checklist: checklist(breaking),
        testing_recommendations,
        impact,
        rollback_plan: include_rollback.then(|| rollback_plan(from, to, breaking)),
    }
}

pub(crate) fn estimate_impact(
    from: ApiVersion,
    usage: &VersionUsage,
    thresholds: RiskThresholds,
) -> ImpactEstimate {
    let affected_requests = usage.requests_for(from);
    let mut affected_endpoints: Vec<String> = usage
        .endpoints_using(from)
        .into_iter()
        .map(|(endpoint, _)| endpoint)
        .collect();
    affected_endpoints.sort();

    ImpactEstimate {
        affected_requests,
        affected_endpoints,
        risk: thresholds.classify(affected_requests),
    }
}

fn checklist(breaking: bool) -> Vec<String> {
    let mut steps = vec![
        "Review the changelog for every version between source and target".to_string(),
        "Audit integrations and API clients pinned to the source version".to_string(),
        "Run a validate migration against representative sample data".to_string(),
        "Notify stakeholders of the migration schedule".to_string(),
    ];

    if breaking {
        steps.extend([
            "Update client code for the breaking response changes".to_string(),
            "Prepare rollback procedures before executing".to_string(),
            "Schedule a maintenance window for the cutover".to_string(),
        ]);
    }

    steps
}

fn testing_recommendations(
    from: ApiVersion,
    to: ApiVersion,
    path: &MigrationPath,
    usage: &VersionUsage,
) -> Vec<String> {
    let mut recommendations = vec![format!(
        "Compare responses from API {from} and API {to} for the same records"
    )];

    for step in path.steps().iter().filter(|step| step.breaking) {
        recommendations.push(format!(
            "Verify client handling of the {} -> {} change: {}",
            step.from, step.to, step.description
        ));
    }

    let capabilities = to.capabilities();
    if capabilities.version_metadata && !from.capabilities().version_metadata {
        recommendations
            .push("Confirm clients ignore or consume the version_info envelope".to_string());
    }
    if capabilities.navigation_flags && !from.capabilities().navigation_flags {
        recommendations
            .push("Exercise pagination using has_next/has_previous instead of page math".to_string());
    }

    let busiest: Vec<String> = usage
        .endpoints_using(from)
        .into_iter()
        .take(BUSIEST_ENDPOINTS)
        .map(|(endpoint, _)| endpoint)
        .collect();
    if !busiest.is_empty() {
        recommendations.push(format!(
            "Prioritise regression tests for the busiest endpoints: {}",
            busiest.join(", ")
        ));
    }

    recommendations
}

fn rollback_plan(from: ApiVersion, to: ApiVersion, breaking: bool) -> RollbackPlan {
    let mut steps = vec![
        format!("Re-pin affected clients to API {from} via the api-version header"),
        format!("Roll back the migration job so API {to} is no longer the tenant default"),
        "Re-run validation against the restored version".to_string(),
    ];
    if breaking {
        steps.push("Revert client releases that adopted the breaking changes".to_string());
    }

    RollbackPlan {
        target_version: from,
        steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::versioning::resolve;

    fn usage() -> VersionUsage {
        VersionUsage::default()
            .with("/api/v1/contracts", "1.0", 6_000)
            .with("/api/v1/signatures", "1.0", 5_000)
            .with("/api/v1/templates", "1.0", 20)
            .with("/api/v1/invoices", "1.0", 10)
            .with("/api/v1/contracts", "1.1", 700)
    }

    #[test]
    fn thresholds_classify_inclusively() {
        let thresholds = RiskThresholds::default();
        assert_eq!(thresholds.classify(0), RiskTier::Low);
        assert_eq!(thresholds.classify(999), RiskTier::Low);
        assert_eq!(thresholds.classify(1_000), RiskTier::Medium);
        assert_eq!(thresholds.classify(9_999), RiskTier::Medium);
        assert_eq!(thresholds.classify(10_000), RiskTier::High);
    }

    #[test]
    fn breaking_paths_extend_the_checklist() {
        let breaking = build_plan(
            ApiVersion::V1_0,
            ApiVersion::V2_0,
            &resolve(ApiVersion::V1_0, ApiVersion::V2_0),
            &usage(),
            RiskThresholds::default(),
            false,
        );
        let additive = build_plan(
            ApiVersion::V1_1,
            ApiVersion::V2_0,
            &resolve(ApiVersion::V1_1, ApiVersion::V2_0),
            &usage(),
            RiskThresholds::default(),
            false,
        );

        assert!(breaking.breaking);
        assert_eq!(breaking.checklist.len(), additive.checklist.len() + 3);
        assert!(breaking
            .checklist
            .iter()
            .any(|step| step.contains("maintenance window")));
        assert!(!additive
            .checklist
            .iter()
            .any(|step| step.contains("rollback")));
    }

    #[test]
    fn impact_uses_source_version_traffic() {
        let impact = estimate_impact(ApiVersion::V1_0, &usage(), RiskThresholds::default());

        assert_eq!(impact.affected_requests, 11_030);
        assert_eq!(impact.risk, RiskTier::High);
        assert_eq!(
            impact.affected_endpoints,
            vec![
                "/api/v1/contracts",
                "/api/v1/invoices",
                "/api/v1/signatures",
                "/api/v1/templates",
            ]
        );

        let impact = estimate_impact(ApiVersion::V1_1, &usage(), RiskThresholds::default());
        assert_eq!(impact.risk, RiskTier::Low);
        assert_eq!(impact.affected_endpoints, vec!["/api/v1/contracts"]);
    }

    #[test]
    fn recommendations_name_breaking_steps_and_busiest_endpoints() {
        let plan = build_plan(
            ApiVersion::V1_0,
            ApiVersion::V2_0,
            &resolve(ApiVersion::V1_0, ApiVersion::V2_0),
            &usage(),
            RiskThresholds::default(),
            false,
        );

        assert!(plan
            .testing_recommendations
            .iter()
            .any(|rec| rec.contains("1.0 -> 1.1")));
        assert!(plan
            .testing_recommendations
            .iter()
            .any(|rec| rec.contains("version_info")));
        let busiest = plan
            .testing_recommendations
            .last()
            .expect("busiest endpoints listed");
        assert!(busiest.contains("/api/v1/contracts, /api/v1/signatures, /api/v1/templates"));
    }

    #[test]
    fn rollback_plan_is_optional_and_targets_the_source() {
        let path = resolve(ApiVersion::V1_0, ApiVersion::V1_1);
        let without = build_plan(
            ApiVersion::V1_0,
            ApiVersion::V1_1,
            &path,
            &usage(),
            RiskThresholds::default(),
            false,
        );
        assert!(without.rollback_plan.is_none());

        let with = build_plan(
            ApiVersion::V1_0,
            ApiVersion::V1_1,
            &path,
            &usage(),
            RiskThresholds::default(),
            true,
        );
        let rollback = with.rollback_plan.expect("rollback plan");
        assert_eq!(rollback.target_version, ApiVersion::V1_0);
        assert_eq!(rollback.steps.len(), 4);
    }
}
