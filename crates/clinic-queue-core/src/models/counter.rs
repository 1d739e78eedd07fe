//! Daily token counter and retention cleanup models.

use serde::{Deserialize, Serialize};

/// One row of per-day token state.
///
/// `last_token` equals the number of tokens issued for `day`; it only moves
/// forward, and only inside an exclusive store transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyCounter {
    /// Business day (`YYYY-MM-DD`)
    pub day: String,
    /// Most recently issued token, 0 before the first issue
    pub last_token: i64,
    /// Last mutation timestamp
    pub updated_at: String,
}

/// Outcome of a retention cleanup run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleanupReport {
    /// Correlation id for this run
    pub run_id: String,
    /// Rows removed strictly before this business day
    pub cutoff_day: String,
    /// Patient rows deleted
    pub patients_deleted: usize,
    /// Counter rows deleted
    pub counters_deleted: usize,
}
