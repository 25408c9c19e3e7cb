use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::session::result::AttemptRecord;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttemptHistoryData {
    pub schema_version: u32,
    pub attempts: Vec<AttemptRecord>,
}

impl Default for AttemptHistoryData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            attempts: Vec::new(),
        }
    }
}

impl AttemptHistoryData {
    pub fn needs_reset(&self) -> bool {
        self.schema_version != SCHEMA_VERSION
    }

    /// Append and drop the oldest entries beyond `limit`.
    pub fn push_capped(&mut self, attempt: AttemptRecord, limit: usize) {
        self.attempts.push(attempt);
        if self.attempts.len() > limit {
            let excess = self.attempts.len() - limit;
            self.attempts.drain(..excess);
        }
    }
}

pub const EXPORT_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportData {
    pub examace_export_version: u32,
    pub exported_at: DateTime<Utc>,
    pub config: Config,
    pub history: AttemptHistoryData,
}
