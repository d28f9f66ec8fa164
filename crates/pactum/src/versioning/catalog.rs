use super::registry::ApiVersion;
use super::shaper::shape_owned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One adjacent-version step. Longer transitions are composed by the resolver.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub from: ApiVersion,
    pub to: ApiVersion,
    pub breaking: bool,
    pub description: &'static str,
    pub migrate: fn(Value) -> Value,
}

impl Migration {
    pub fn apply(&self, payload: Value) -> Value {
        (self.migrate)(payload)
    }

    pub fn view(&self) -> MigrationStepView {
        MigrationStepView {
            from: self.from,
            to: self.to,
            breaking: self.breaking,
            description: self.description.to_string(),
        }
    }
}

/// Serializable description of a step for plans and job records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStepView {
    pub from: ApiVersion,
    pub to: ApiVersion,
    pub breaking: bool,
    pub description: String,
}

static CATALOG: [Migration; 2] = [
    Migration {
        from: ApiVersion::V1_0,
        to: ApiVersion::V1_1,
        breaking: true,
        description: "Renames pagination fields and exposes analytics and permission extensions",
        migrate: migrate_to_standard,
    },
    Migration {
        from: ApiVersion::V1_1,
        to: ApiVersion::V2_0,
        breaking: false,
        description: "Adds the version_info envelope and has_next/has_previous pagination flags",
        migrate: migrate_to_enhanced,
    },
];

fn migrate_to_standard(payload: Value) -> Value {
    shape_owned(payload, ApiVersion::V1_1)
}

fn migrate_to_enhanced(payload: Value) -> Value {
    shape_owned(payload, ApiVersion::V2_0)
}

pub fn catalog() -> &'static [Migration] {
    &CATALOG
}

pub fn step(from: ApiVersion, to: ApiVersion) -> Option<&'static Migration> {
    CATALOG
        .iter()
        .find(|migration| migration.from == from && migration.to == to)
}
