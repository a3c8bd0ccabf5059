use crate::core::rule::AccrualRule;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const EXPORT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("malformed export document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported export version {0}, expected {}", EXPORT_VERSION)]
    UnsupportedVersion(u32),
}

/// Accrual rules as exchanged with backups and other devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleExport {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub rules: Vec<AccrualRule>,
}

impl RuleExport {
    pub fn new(exported_at: DateTime<Utc>, rules: Vec<AccrualRule>) -> Self {
        Self {
            version: EXPORT_VERSION,
            exported_at,
            rules,
        }
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(input: &str) -> Result<Self, ExportError> {
        let export: RuleExport = serde_json::from_str(input)?;
        if export.version != EXPORT_VERSION {
            return Err(ExportError::UnsupportedVersion(export.version));
        }
        Ok(export)
    }
}
