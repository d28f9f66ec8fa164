use super::error::VersioningError;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Public API versions in release order. Ordering follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ApiVersion {
    V1_0,
    V1_1,
    V2_0,
}

static REGISTRY: [ApiVersion; 3] = ApiVersion::ordered();

impl ApiVersion {
    pub const fn ordered() -> [Self; 3] {
        [Self::V1_0, Self::V1_1, Self::V2_0]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1_0 => "1.0",
            Self::V1_1 => "1.1",
            Self::V2_0 => "2.0",
        }
    }

    /// Position in the registry; adjacent versions differ by one.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn oldest() -> Self {
        Self::V1_0
    }

    /// Version served when a caller does not pin one.
    pub const fn current() -> Self {
        Self::V2_0
    }

    pub fn parse(candidate: &str) -> Option<Self> {
        REGISTRY
            .iter()
            .copied()
            .find(|version| version.as_str() == candidate)
    }

    pub fn next(self) -> Option<Self> {
        REGISTRY.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Self> {
        self.index()
            .checked_sub(1)
            .and_then(|index| REGISTRY.get(index).copied())
    }

    pub const fn response_format(self) -> &'static str {
        match self {
            Self::V1_0 => "legacy",
            Self::V1_1 => "standard",
            Self::V2_0 => "enhanced",
        }
    }

    pub const fn capabilities(self) -> VersionCapabilities {
        match self {
            Self::V1_0 => VersionCapabilities {
                enhanced_analytics: false,
                advanced_permissions: false,
                version_metadata: false,
                navigation_flags: false,
            },
            Self::V1_1 => VersionCapabilities {
                enhanced_analytics: true,
                advanced_permissions: true,
                version_metadata: false,
                navigation_flags: false,
            },
            Self::V2_0 => VersionCapabilities {
                enhanced_analytics: true,
                advanced_permissions: true,
                version_metadata: true,
                navigation_flags: true,
            },
        }
    }

    pub fn deprecation(self) -> Option<DeprecationNotice> {
        match self {
            Self::V1_0 => NaiveDate::from_ymd_opt(2027, 6, 30).map(|sunset_on| DeprecationNotice {
                version: self,
                sunset_on,
                replacement: Self::current(),
                message: format!(
                    "API {} is deprecated and will stop responding after {sunset_on}; migrate to {}",
                    self,
                    Self::current()
                ),
            }),
            Self::V1_1 | Self::V2_0 => None,
        }
    }

    pub fn is_deprecated(self) -> bool {
        self.deprecation().is_some()
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = VersioningError;

    fn from_str(candidate: &str) -> Result<Self, Self::Err> {
        Self::parse(candidate).ok_or_else(|| VersioningError::unsupported(candidate))
    }
}

impl Serialize for ApiVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Feature flags exposed to consumers pinned to a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VersionCapabilities {
    pub enhanced_analytics: bool,
    pub advanced_permissions: bool,
    pub version_metadata: bool,
    pub navigation_flags: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecationNotice {
    pub version: ApiVersion,
    pub sunset_on: NaiveDate,
    pub replacement: ApiVersion,
    pub message: String,
}

/// Registry entry as exposed by the version listing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct VersionDescriptor {
    pub version: ApiVersion,
    pub response_format: &'static str,
    pub current: bool,
    pub capabilities: VersionCapabilities,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation: Option<DeprecationNotice>,
}

impl From<ApiVersion> for VersionDescriptor {
    fn from(version: ApiVersion) -> Self {
        Self {
            version,
            response_format: version.response_format(),
            current: version == ApiVersion::current(),
            capabilities: version.capabilities(),
            deprecation: version.deprecation(),
        }
    }
}

pub fn list_versions() -> &'static [ApiVersion] {
    &REGISTRY
}

pub fn is_version_supported(candidate: &str) -> bool {
    ApiVersion::parse(candidate).is_some()
}

/// Version gate for loosely typed input; only JSON strings can name a version.
pub fn is_supported_value(candidate: &Value) -> bool {
    candidate.as_str().is_some_and(is_version_supported)
}

pub fn supported_version_strings() -> Vec<&'static str> {
    REGISTRY.iter().map(|version| version.as_str()).collect()
}

pub fn deprecation_notices() -> Vec<DeprecationNotice> {
    REGISTRY
        .iter()
        .filter_map(|version| version.deprecation())
        .collect()
}

pub fn describe_versions() -> Vec<VersionDescriptor> {
    REGISTRY.iter().copied().map(VersionDescriptor::from).collect()
}
