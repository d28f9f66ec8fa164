use crate::infra::{InMemoryJobStore, UsageBackend};
use clap::Args;
use pactum::error::AppError;
use pactum::migrations::{
    MigrationJob, MigrationOrchestrator, MigrationPlan, MigrationServiceError, RiskThresholds,
    TenantId, ValidationOutcome,
};
use pactum::versioning::registry::describe_versions;
use pactum::versioning::{compatibility_matrix, shape, ApiVersion};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Tenant whose usage drives the migration plan
    #[arg(long, default_value = "acme")]
    pub(crate) tenant: String,
    /// Source API version
    #[arg(long, default_value = "1.0")]
    pub(crate) from: String,
    /// Target API version
    #[arg(long, default_value = "2.0")]
    pub(crate) to: String,
    /// Optional `tenant,endpoint,version,requests` CSV export replacing the seeded usage
    #[arg(long)]
    pub(crate) usage_csv: Option<PathBuf>,
    /// Stop after execution instead of rolling the migration back
    #[arg(long)]
    pub(crate) skip_rollback: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ShapeArgs {
    /// API version to shape the payload for
    #[arg(long = "api-version")]
    pub(crate) api_version: String,
    /// JSON file holding the payload
    pub(crate) file: PathBuf,
}

pub(crate) fn run_versions() -> Result<(), AppError> {
    println!("Pactum API versions (current: {})", ApiVersion::current());
    for descriptor in describe_versions() {
        let capabilities = descriptor.capabilities;
        println!(
            "- {} [{}]{}",
            descriptor.version,
            descriptor.response_format,
            if descriptor.current { " (current)" } else { "" }
        );
        println!(
            "    analytics: {}, permissions: {}, version metadata: {}, navigation flags: {}",
            yes_no(capabilities.enhanced_analytics),
            yes_no(capabilities.advanced_permissions),
            yes_no(capabilities.version_metadata),
            yes_no(capabilities.navigation_flags)
        );
        if let Some(notice) = descriptor.deprecation {
            println!("    deprecated: {}", notice.message);
        }
    }

    println!("\nMigration paths");
    for entry in compatibility_matrix() {
        let status = match (entry.available, entry.breaking) {
            (false, _) => "unavailable",
            (true, true) => "available (breaking)",
            (true, false) => "available",
        };
        println!("- {} -> {}: {status}", entry.from, entry.to);
    }
    Ok(())
}

pub(crate) fn run_shape(args: ShapeArgs) -> Result<(), AppError> {
    let version: ApiVersion = args.api_version.parse().map_err(MigrationServiceError::from)?;
    let raw = std::fs::read_to_string(&args.file)?;
    let payload: Value = serde_json::from_str(&raw)?;

    let shaped = shape(&payload, version);
    println!("{}", serde_json::to_string_pretty(&shaped)?);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        tenant,
        from,
        to,
        usage_csv,
        skip_rollback,
    } = args;

    let analytics = UsageBackend::load(usage_csv.as_deref())?;
    let orchestrator = MigrationOrchestrator::new(
        Arc::new(InMemoryJobStore::default()),
        Arc::new(analytics),
        RiskThresholds::default(),
    );
    let tenant = TenantId(tenant);

    println!("Pactum migration demo for tenant '{tenant}' ({from} -> {to})");

    let plan = orchestrator.plan(&tenant, &from, &to, true)?;
    render_plan(&plan);

    let samples = demo_samples();
    let validation = orchestrator.validate(&from, &to, &samples)?;
    render_validation(&validation);

    let job = orchestrator.execute(&tenant, "demo@pactum", &from, &to, &samples)?;
    render_job("Executed", &job);

    if !skip_rollback {
        let job = orchestrator.rollback(&tenant, "demo@pactum", &job.id)?;
        render_job("Rolled back", &job);
    }

    let history = orchestrator.history(&tenant)?;
    println!("\nJob history ({} entries)", history.len());
    for job in history {
        println!("- {} {} -> {}: {}", job.id, job.from_version, job.to_version, job.status);
    }
    Ok(())
}

fn demo_samples() -> Vec<Value> {
    vec![
        json!({
            "id": "ctr-1001",
            "name": "Master Services Agreement",
            "status": "active",
            "pagination": {"page": 1, "limit": 20, "total": 42},
        }),
        json!({
            "id": "ctr-1002",
            "name": "Mutual NDA",
            "status": "awaiting_signature",
            "renewal_on": null,
        }),
    ]
}

fn render_plan(plan: &MigrationPlan) {
    println!("\nPlan ({} step(s), breaking: {})", plan.steps.len(), yes_no(plan.breaking));
    for step in &plan.steps {
        println!("  {} -> {}: {}", step.from, step.to, step.description);
    }
    println!(
        "  impact: {} request(s) across {} endpoint(s), risk {:?}",
        plan.impact.affected_requests,
        plan.impact.affected_endpoints.len(),
        plan.impact.risk
    );
    println!("  checklist:");
    for item in &plan.checklist {
        println!("    - {item}");
    }
    println!("  testing:");
    for item in &plan.testing_recommendations {
        println!("    - {item}");
    }
    if let Some(rollback) = &plan.rollback_plan {
        println!("  rollback to {}:", rollback.target_version);
        for item in &rollback.steps {
            println!("    - {item}");
        }
    }
}

fn render_validation(outcome: &ValidationOutcome) {
    println!(
        "\nValidation: {} sample(s), compatible: {}, ready: {}",
        outcome.report.samples_checked,
        yes_no(outcome.report.compatible),
        yes_no(outcome.ready)
    );
    for issue in &outcome.report.issues {
        println!(
            "  [{:?}] sample {}: {}",
            issue.severity, issue.sample_index, issue.message
        );
    }
}

fn render_job(label: &str, job: &MigrationJob) {
    println!("\n{label} job {} (status: {})", job.id, job.status);
    for result in &job.results {
        println!(
            "  {} ({} request(s), {} step(s))",
            result.endpoint, result.requests_affected, result.steps_applied
        );
    }
    if let Some(error) = &job.error {
        println!("  error: {error}");
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
