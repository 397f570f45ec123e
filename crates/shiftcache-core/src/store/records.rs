use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ShiftError;
use crate::models::{ShiftRecord, ShiftStatus};

/// On-disk shape of the shift file.
#[derive(Debug, Deserialize)]
struct ShiftFile {
    shifts: Vec<ShiftRecord>,
}

#[derive(Debug, Serialize)]
struct ShiftFileRef<'a> {
    shifts: &'a [ShiftRecord],
}

/// Result of a batch status update that changed at least one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub updated: Vec<ShiftRecord>,
    pub not_found: Vec<String>,
    /// Found, but not pending (or already in the requested status).
    pub skipped: Vec<String>,
}

pub struct RecordStore {
    path: PathBuf,
    loads: AtomicU64,
    writes: AtomicU64,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of successful full-collection reads.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    /// Number of full-collection writes.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Read the whole collection from the shift file.
    pub async fn load(&self) -> Result<Vec<ShiftRecord>, ShiftError> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ShiftError::SourceUnavailable(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        let file: ShiftFile = serde_json::from_str(&contents).map_err(|e| {
            ShiftError::SourceUnavailable(format!("Failed to parse {}: {}", self.path.display(), e))
        })?;

        if let Some(shift) = file.shifts.iter().find(|s| s.end_time <= s.start_time) {
            return Err(ShiftError::SourceUnavailable(format!(
                "Shift {} in {} does not end after it starts",
                shift.id,
                self.path.display()
            )));
        }

        self.loads.fetch_add(1, Ordering::Relaxed);
        debug!(path = %self.path.display(), count = file.shifts.len(), "Loaded shifts");
        Ok(file.shifts)
    }

    async fn persist(&self, shifts: &[ShiftRecord]) -> Result<(), ShiftError> {
        let contents = serde_json::to_string_pretty(&ShiftFileRef { shifts }).map_err(|e| {
            ShiftError::SourceUnavailable(format!("Failed to serialize shifts: {}", e))
        })?;

        tokio::fs::write(&self.path, contents).await.map_err(|e| {
            ShiftError::SourceUnavailable(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        self.writes.fetch_add(1, Ordering::Relaxed);
        debug!(path = %self.path.display(), count = shifts.len(), "Wrote shifts");
        Ok(())
    }

    /// Set the status of a single shift and persist the collection.
    ///
    /// Leaves cached queries in place; outside the crate writes go through
    /// `ShiftService`, which clears them.
    pub(crate) async fn update_one(
        &self,
        id: &str,
        status: ShiftStatus,
        actor: &str,
    ) -> Result<ShiftRecord, ShiftError> {
        let mut shifts = self.load().await?;

        let shift = shifts
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ShiftError::NotFound(id.to_string()))?;

        check_transition(shift, status)?;
        shift.apply_status(status, actor, Utc::now());
        let updated = shift.clone();

        self.persist(&shifts).await?;
        Ok(updated)
    }

    /// Set the status of many shifts with one load and one write.
    ///
    /// Unknown ids are collected in `not_found` and records that cannot
    /// transition in `skipped`; neither fails the batch while at least one
    /// record was updated.
    pub(crate) async fn update_many(
        &self,
        ids: &[String],
        status: ShiftStatus,
        actor: &str,
    ) -> Result<BatchOutcome, ShiftError> {
        if ids.is_empty() {
            return Err(ShiftError::NoneMatched(Vec::new()));
        }

        let mut shifts = self.load().await?;
        let now = Utc::now();
        let mut outcome = BatchOutcome::default();
        let mut first_rejection = None;
        let mut seen = HashSet::new();

        for id in ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            match shifts.iter_mut().find(|s| &s.id == id) {
                Some(shift) => match check_transition(shift, status) {
                    Ok(()) => {
                        shift.apply_status(status, actor, now);
                        outcome.updated.push(shift.clone());
                    }
                    Err(e) => {
                        first_rejection.get_or_insert(e);
                        outcome.skipped.push(id.clone());
                    }
                },
                None => outcome.not_found.push(id.clone()),
            }
        }

        if outcome.updated.is_empty() {
            return Err(first_rejection.unwrap_or_else(|| ShiftError::NoneMatched(ids.to_vec())));
        }

        self.persist(&shifts).await?;
        Ok(outcome)
    }
}

fn check_transition(shift: &ShiftRecord, to: ShiftStatus) -> Result<(), ShiftError> {
    if shift.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(ShiftError::InvalidTransition {
            id: shift.id.clone(),
            from: shift.status,
            to,
        })
    }
}
