//! Nudge dedupe ledger: `{data_dir}/nudges/sent.json` maps
//! `"task-id:type:yyyy-mm-dd"` to the ISO timestamp a nudge was last sent
//! for it, so the same task/day/type combination never fires twice even
//! across restarts. Grounded on
//! `examples/original_source/src/assistant/services/nudges.py`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};

use crate::error::Result;
use crate::types::NudgeType;

const PRUNE_AFTER_DAYS: i64 = 7;

pub struct DedupeLedger {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl DedupeLedger {
    pub fn in_data_dir(data_dir: &str) -> Result<Self> {
        Self::load(Path::new(data_dir).join("nudges").join("sent.json"))
    }

    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)?,
            _ => HashMap::new(),
        };
        Ok(Self { path, entries })
    }

    pub fn key(task_id: &str, nudge_type: NudgeType, yyyy_mm_dd: &str) -> String {
        format!("{task_id}:{nudge_type}:{yyyy_mm_dd}")
    }

    pub fn was_sent(&self, task_id: &str, nudge_type: NudgeType, yyyy_mm_dd: &str) -> bool {
        self.entries.contains_key(&Self::key(task_id, nudge_type, yyyy_mm_dd))
    }

    /// Records a send and prunes anything older than 7 days, then persists.
    pub fn mark_sent(&mut self, task_id: &str, nudge_type: NudgeType, yyyy_mm_dd: &str) -> Result<()> {
        let key = Self::key(task_id, nudge_type, yyyy_mm_dd);
        self.entries.insert(key, Utc::now().to_rfc3339());
        self.prune();
        self.persist()
    }

    fn prune(&mut self) {
        let cutoff = Utc::now() - Duration::days(PRUNE_AFTER_DAYS);
        self.entries.retain(|_, sent_at| {
            chrono::DateTime::parse_from_rfc3339(sent_at).map(|dt| dt.with_timezone(&Utc) > cutoff).unwrap_or(false)
        });
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn records_and_checks_sent_state() {
        let dir = TempDir::new().unwrap();
        let mut ledger = DedupeLedger::load(dir.path().join("sent.json")).unwrap();

        assert!(!ledger.was_sent("T1", NudgeType::DueToday, "2026-07-27"));
        ledger.mark_sent("T1", NudgeType::DueToday, "2026-07-27").unwrap();
        assert!(ledger.was_sent("T1", NudgeType::DueToday, "2026-07-27"));
    }

    #[test]
    fn persists_across_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sent.json");
        {
            let mut ledger = DedupeLedger::load(&path).unwrap();
            ledger.mark_sent("T1", NudgeType::Overdue, "2026-07-27").unwrap();
        }
        let reloaded = DedupeLedger::load(&path).unwrap();
        assert!(reloaded.was_sent("T1", NudgeType::Overdue, "2026-07-27"));
    }
}
