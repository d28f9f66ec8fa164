use super::registry::{supported_version_strings, ApiVersion};

/// Rejections raised before any payload is transformed or job recorded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersioningError {
    #[error("unsupported API version '{candidate}'")]
    UnsupportedVersion {
        candidate: String,
        supported: Vec<&'static str>,
    },
    #[error("no migration path from API {from} to API {to}")]
    UnreachablePath { from: ApiVersion, to: ApiVersion },
    #[error("source and target are both API {version}; nothing to migrate")]
    IdenticalVersions { version: ApiVersion },
}

impl VersioningError {
    pub fn unsupported(candidate: &str) -> Self {
        Self::UnsupportedVersion {
            candidate: candidate.to_string(),
            supported: supported_version_strings(),
        }
    }
}
