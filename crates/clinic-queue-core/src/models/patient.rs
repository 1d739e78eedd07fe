//! Patient records and consultation status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Consultation status of a queued patient.
///
/// `Waiting` is the only initial state; `Completed` and `Cancelled` are
/// terminal. Legal transitions:
///
/// ```text
/// Waiting ──start──▶ InConsultation ──complete──▶ Completed
///    │
///    └────cancel───▶ Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatientStatus {
    Waiting,
    InConsultation,
    Completed,
    Cancelled,
}

impl PatientStatus {
    /// All statuses, in dashboard display order.
    pub const ALL: [PatientStatus; 4] = [
        PatientStatus::Waiting,
        PatientStatus::InConsultation,
        PatientStatus::Completed,
        PatientStatus::Cancelled,
    ];

    /// The canonical string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Waiting => "Waiting",
            PatientStatus::InConsultation => "In Consultation",
            PatientStatus::Completed => "Completed",
            PatientStatus::Cancelled => "Cancelled",
        }
    }

    /// Parse a stored status string. Unknown strings are a constraint
    /// violation at the storage layer, never remapped to a default.
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "Waiting" => Some(PatientStatus::Waiting),
            "In Consultation" => Some(PatientStatus::InConsultation),
            "Completed" => Some(PatientStatus::Completed),
            "Cancelled" => Some(PatientStatus::Cancelled),
            _ => None,
        }
    }

    /// No further transition is legal from a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PatientStatus::Completed | PatientStatus::Cancelled)
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A patient in the daily queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientRecord {
    /// System-assigned row id, immutable
    pub id: i64,
    /// Business day the record belongs to (`YYYY-MM-DD`)
    pub day: String,
    /// Queue position for the day, assigned once at creation
    pub token_number: i64,
    /// Patient name (required, non-empty)
    pub name: String,
    /// Age in years
    pub age: Option<u32>,
    /// Visit purpose
    pub purpose: Option<String>,
    /// Front-desk notes
    pub notes: Option<String>,
    /// Current consultation status
    pub current_status: PatientStatus,
    /// Creation timestamp (RFC 3339, UTC), immutable
    pub created_at: String,
}

/// Per-status counts for today's queue, zero-filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardCounts {
    pub waiting: u32,
    pub in_consultation: u32,
    pub completed: u32,
    pub cancelled: u32,
}

impl DashboardCounts {
    /// The count for a single status.
    pub fn get(&self, status: PatientStatus) -> u32 {
        match status {
            PatientStatus::Waiting => self.waiting,
            PatientStatus::InConsultation => self.in_consultation,
            PatientStatus::Completed => self.completed,
            PatientStatus::Cancelled => self.cancelled,
        }
    }

    /// Increment the count for a status.
    pub fn add(&mut self, status: PatientStatus, count: u32) {
        match status {
            PatientStatus::Waiting => self.waiting += count,
            PatientStatus::InConsultation => self.in_consultation += count,
            PatientStatus::Completed => self.completed += count,
            PatientStatus::Cancelled => self.cancelled += count,
        }
    }

    /// Total records registered today.
    pub fn total(&self) -> u32 {
        self.waiting + self.in_consultation + self.completed + self.cancelled
    }
}
