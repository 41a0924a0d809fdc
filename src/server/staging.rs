use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How long a validated batch stays claimable before confirm.
const STAGING_TTL_MINUTES: i64 = 30;

/// A validated CSV row with every reference resolved to its canonical name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedRow {
    pub row_number: usize,
    pub device_name: String,
    pub device_model: String,
    pub serial_number: String,
    pub device_type: String,
    pub status: String,
    pub location: String,
    pub department: Option<String>,
    pub staff_name: Option<String>,
}

struct StagedImport {
    rows: Vec<StagedRow>,
    created_at: DateTime<Utc>,
}

/// In-process holding area for the two-phase import flow. Validation
/// stages the parsed rows under an opaque id; confirm claims them
/// exactly once. Entries expire rather than accumulate.
#[derive(Default)]
pub struct ImportStaging {
    batches: Mutex<HashMap<String, StagedImport>>,
}

impl ImportStaging {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a validated batch and returns its claim id.
    pub fn stage(&self, rows: Vec<StagedRow>) -> String {
        let id = Uuid::new_v4().to_string();
        let mut batches = self.batches.lock().unwrap_or_else(|e| e.into_inner());

        // Opportunistic sweep so abandoned batches don't pile up.
        let cutoff = Utc::now() - Duration::minutes(STAGING_TTL_MINUTES);
        batches.retain(|_, b| b.created_at >= cutoff);

        batches.insert(
            id.clone(),
            StagedImport {
                rows,
                created_at: Utc::now(),
            },
        );
        id
    }

    /// Claims a staged batch, removing it. Returns None when the id is
    /// unknown, already claimed, or expired.
    pub fn take(&self, id: &str) -> Option<Vec<StagedRow>> {
        let mut batches = self.batches.lock().unwrap_or_else(|e| e.into_inner());
        let staged = batches.remove(id)?;

        let cutoff = Utc::now() - Duration::minutes(STAGING_TTL_MINUTES);
        if staged.created_at < cutoff {
            return None;
        }

        Some(staged.rows)
    }
}
