use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::domain::TenantId;
use super::repository::{AnalyticsError, UsageAnalytics, VersionUsage};

/// Usage analytics loaded from a `tenant,endpoint,version,requests` CSV export.
#[derive(Debug, Clone, Default)]
pub struct CsvUsageAnalytics {
    usage: BTreeMap<TenantId, VersionUsage>,
}

impl CsvUsageAnalytics {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, AnalyticsError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AnalyticsError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut usage: BTreeMap<TenantId, VersionUsage> = BTreeMap::new();

        for row in csv_reader.deserialize::<UsageRow>() {
            let row = row?;
            usage
                .entry(TenantId(row.tenant))
                .or_default()
                .record(&row.endpoint, &row.version, row.requests);
        }

        Ok(Self { usage })
    }

    pub fn tenants(&self) -> impl Iterator<Item = &TenantId> {
        self.usage.keys()
    }
}

impl UsageAnalytics for CsvUsageAnalytics {
    fn version_usage(&self, tenant: &TenantId) -> Result<VersionUsage, AnalyticsError> {
        Ok(self.usage.get(tenant).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct UsageRow {
    tenant: String,
    endpoint: String,
    version: String,
    requests: u64,
}
