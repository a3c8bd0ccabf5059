//! JSON file persistence for the ledger.
//!
//! The whole state lives in one document. Commits write a sibling temp
//! file, sync it, then rename it over the existing file, so readers only ever
//! see the old document or the new one.

use crate::core::baseline::Baseline;
use crate::core::rule::AccrualRule;
use crate::core::rule_set::AccrualRuleSet;
use crate::engine::error::StoreError;
use crate::engine::store::{LedgerCommit, LedgerStore};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StateDocument {
    version: u32,
    baseline: Option<Baseline>,
    rules: AccrualRuleSet,
}

/// Store backed by a single JSON document on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    document: StateDocument,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty, unseeded ledger.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let document = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let document: StateDocument = serde_json::from_str(&content)?;
            if document.version != STATE_VERSION {
                return Err(StoreError::Rejected(format!(
                    "unsupported state version {} in {}",
                    document.version,
                    path.display()
                )));
            }
            document
        } else {
            StateDocument {
                version: STATE_VERSION,
                ..Default::default()
            }
        };
        Ok(Self { path, document })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_document(&self, document: &StateDocument) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(document)?;
        let temp = self.temp_path();
        {
            let mut file = File::create(&temp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

impl LedgerStore for JsonFileStore {
    fn load_baseline(&self) -> Result<Option<Baseline>, StoreError> {
        Ok(self.document.baseline)
    }

    fn load_rules(&self) -> Result<Vec<AccrualRule>, StoreError> {
        Ok(self.document.rules.rules().to_vec())
    }

    fn commit(&mut self, commit: &LedgerCommit) -> Result<(), StoreError> {
        let mut next = self.document.clone();
        commit.apply_to(&mut next.rules);
        next.baseline = Some(commit.baseline);
        self.write_document(&next)?;
        self.document = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frequency::Frequency;
    use crate::core::rule::RuleKind;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir().join(format!("accrual-ledger-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_missing_file_is_unseeded() {
        let store = JsonFileStore::open(scratch_path()).unwrap();
        assert_eq!(store.load_baseline().unwrap(), None);
        assert!(store.load_rules().unwrap().is_empty());
    }

    #[test]
    fn test_commit_survives_reopen() {
        let path = scratch_path();
        let at = Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap();
        let rule = AccrualRule::new("Salary", RuleKind::Income, dec!(9000), Frequency::Monthly, at)
            .unwrap()
            .with_accumulated_minutes(600)
            .unwrap();

        let mut store = JsonFileStore::open(&path).unwrap();
        store
            .commit(&LedgerCommit {
                baseline: Baseline::new(at, dec!(1000.50)),
                upserts: vec![rule.clone()],
                deletes: vec![],
            })
            .unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.load_baseline().unwrap(), Some(Baseline::new(at, dec!(1000.50))));
        assert_eq!(reopened.load_rules().unwrap(), vec![rule]);
        assert!(!reopened.temp_path().exists());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_rejects_unknown_version() {
        let path = scratch_path();
        fs::write(&path, r#"{"version": 99, "baseline": null, "rules": []}"#).unwrap();
        let err = JsonFileStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
        fs::remove_file(&path).unwrap();
    }
}
