//! API version registry, response shaping, and the migration chain engine.
//!
//! The registry and catalog are immutable statics; everything else here is a pure function over
//! its inputs, so callers can share it freely across request handlers.

pub mod catalog;
mod error;
pub mod executor;
pub mod negotiation;
pub mod registry;
pub mod resolver;
pub mod shaper;
pub mod validator;

pub use catalog::{catalog, Migration, MigrationStepView};
pub use error::VersioningError;
pub use executor::{apply_chain, apply_path, try_apply_chain};
pub use negotiation::{version_router, versioned, API_VERSION_HEADER};
pub use registry::{
    deprecation_notices, is_supported_value, is_version_supported, list_versions,
    supported_version_strings, ApiVersion, DeprecationNotice, VersionCapabilities,
};
pub use resolver::{
    compatibility_matrix, is_migration_available, resolve, resolve_str, CompatibilityEntry,
    MigrationPath,
};
pub use shaper::{shape, shape_for};
pub use validator::{validate, CompatibilityIssue, CompatibilityReport, IssueSeverity};
