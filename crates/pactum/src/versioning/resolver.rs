use super::catalog::{self, Migration, MigrationStepView};
use super::registry::{list_versions, ApiVersion};
use serde::Serialize;

/// Ordered chain of adjacent steps. Only [`resolve`] builds one.
#[derive(Debug, Clone, Default)]
pub struct MigrationPath {
    steps: Vec<&'static Migration>,
}

impl MigrationPath {
    pub fn steps(&self) -> &[&'static Migration] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_breaking(&self) -> bool {
        self.steps.iter().any(|step| step.breaking)
    }

    /// True when the steps chain end-to-end from `from` to `to` without gaps.
    pub fn connects(&self, from: ApiVersion, to: ApiVersion) -> bool {
        match (self.steps.first(), self.steps.last()) {
            (Some(first), Some(last)) => {
                first.from == from
                    && last.to == to
                    && self
                        .steps
                        .windows(2)
                        .all(|pair| pair[0].to == pair[1].from)
            }
            _ => from == to,
        }
    }

    pub fn views(&self) -> Vec<MigrationStepView> {
        self.steps.iter().map(|step| step.view()).collect()
    }
}

/// Walks the registry upward from `from`, collecting catalog steps until `to`.
///
/// Downgrades are not catalogued, so a descending pair yields an empty path.
pub fn resolve(from: ApiVersion, to: ApiVersion) -> MigrationPath {
    let mut steps = Vec::new();
    let mut cursor = from;

    while cursor < to {
        let Some(next) = cursor.next() else {
            break;
        };
        match catalog::step(cursor, next) {
            Some(step) => steps.push(step),
            None => break,
        }
        cursor = next;
    }

    MigrationPath { steps }
}

/// String-keyed resolution; unsupported names produce an empty path.
pub fn resolve_str(from: &str, to: &str) -> MigrationPath {
    match (ApiVersion::parse(from), ApiVersion::parse(to)) {
        (Some(from), Some(to)) => resolve(from, to),
        _ => MigrationPath::default(),
    }
}

pub fn is_migration_available(from: ApiVersion, to: ApiVersion) -> bool {
    resolve(from, to).connects(from, to)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityEntry {
    pub from: ApiVersion,
    pub to: ApiVersion,
    pub available: bool,
    pub breaking: bool,
}

/// Every ordered pair of distinct registry versions with its availability.
pub fn compatibility_matrix() -> Vec<CompatibilityEntry> {
    let versions = list_versions();
    let mut entries = Vec::with_capacity(versions.len() * versions.len().saturating_sub(1));

    for &from in versions {
        for &to in versions {
            if from == to {
                continue;
            }
            let path = resolve(from, to);
            let available = path.connects(from, to);
            entries.push(CompatibilityEntry {
                from,
                to,
                available,
                breaking: available && path.is_breaking(),
            });
        }
    }

    entries
}
