//! Clinic Queue Core Library
//!
//! Daily token queue and consultation state machine for a single-doctor
//! clinic front desk.
//!
//! # Architecture
//!
//! ```text
//!        Front Desk                         Doctor Dashboard
//!            │                                     │
//!       register ────┐                 start / complete / cancel
//!            │       │                             │
//!            ▼       │                             ▼
//!   ┌────────────────▼───┐              ┌─────────────────────┐
//!   │   Token Allocator  │              │  Status State Machine│
//!   │  per-day counter,  │              │  Waiting → InConsult │
//!   │  exclusive txn     │              │  → Completed / Canc. │
//!   └────────┬───────────┘              └──────────┬──────────┘
//!            │                                     │
//!            └──────────────┬──────────────────────┘
//!                           ▼
//!                 ┌───────────────────┐
//!                 │   SQLite store    │  daily_counters, patients
//!                 └─────────┬─────────┘
//!                           │
//!              queue listing / dashboard counts
//!             (business-day scoped, shared view)
//! ```
//!
//! # Core Principle
//!
//! **The store is the only authority.** Token numbers come from an exclusive
//! transaction on the per-day counter row, never a process variable; every
//! read re-queries the store so front desk and doctor always see the same
//! queue. All day scoping goes through one [`day::BusinessCalendar`].
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer
//! - [`models`]: Domain types (PatientRecord, PatientStatus, DailyCounter, etc.)
//! - [`day`]: Business-day computation in the clinic timezone
//! - [`tokens`]: Daily token allocator
//! - [`queue`]: Registration, status transitions, queue/dashboard queries
//! - [`config`]: Runtime configuration

pub mod config;
pub mod day;
pub mod db;
pub mod models;
pub mod queue;
pub mod tokens;

// Re-export commonly used types
pub use config::{ClinicConfig, ConfigError};
pub use day::BusinessCalendar;
pub use db::Database;
pub use models::{CleanupReport, DailyCounter, DashboardCounts, PatientRecord, PatientStatus};
pub use queue::{PatientQueue, QueueError};
pub use tokens::{TokenAllocator, TokenError};

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

// =========================================================================
// Boundary Error Type
// =========================================================================

/// Service-boundary error: the flattened taxonomy an embedding transport
/// maps onto its own status codes (validation → 400, not found → 404,
/// rejected transitions → 409, conflict → retryable 5xx).
#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("No patient with id {0}")]
    NotFound(i64),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("Consultation already active for patient {0}")]
    ConsultationActive(i64),

    #[error("Transient conflict, retry: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<queue::QueueError> for ClinicError {
    fn from(e: queue::QueueError) -> Self {
        match e {
            QueueError::Validation(msg) => ClinicError::Validation(msg),
            QueueError::NotFound(id) => ClinicError::NotFound(id),
            QueueError::InvalidTransition { .. } => ClinicError::InvalidTransition(e.to_string()),
            QueueError::ConsultationActive { active_id } => {
                ClinicError::ConsultationActive(active_id)
            }
            QueueError::Conflict { .. } => ClinicError::Conflict(e.to_string()),
            QueueError::Token(e) => e.into(),
            QueueError::Database(e) => e.into(),
        }
    }
}

impl From<tokens::TokenError> for ClinicError {
    fn from(e: tokens::TokenError) -> Self {
        match e {
            TokenError::Conflict(_) => ClinicError::Conflict(e.to_string()),
            TokenError::Database(e) => e.into(),
        }
    }
}

impl From<db::DbError> for ClinicError {
    fn from(e: db::DbError) -> Self {
        ClinicError::Database(e.to_string())
    }
}

impl From<config::ConfigError> for ClinicError {
    fn from(e: config::ConfigError) -> Self {
        ClinicError::Config(e.to_string())
    }
}

impl<T> From<PoisonError<T>> for ClinicError {
    fn from(e: PoisonError<T>) -> Self {
        ClinicError::Database(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Main Service Object
// =========================================================================

/// Thread-safe clinic queue service.
///
/// Safe to share across request handlers (`Send + Sync`); the storage-level
/// transactions carry the correctness guarantees, so multiple processes may
/// also point at the same database file.
pub struct ClinicCore {
    db: Arc<Mutex<Database>>,
    calendar: BusinessCalendar,
    max_retries: u32,
}

impl ClinicCore {
    /// Open or create a clinic database at the given path.
    pub fn open<P: AsRef<Path>>(path: P, config: &ClinicConfig) -> Result<Self, ClinicError> {
        let calendar = config.calendar()?;
        let db = Database::open(path)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            calendar,
            max_retries: config.max_conflict_retries,
        })
    }

    /// Create an in-memory clinic database (for testing).
    pub fn open_in_memory(config: &ClinicConfig) -> Result<Self, ClinicError> {
        let calendar = config.calendar()?;
        let db = Database::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            calendar,
            max_retries: config.max_conflict_retries,
        })
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a patient into today's queue with the next token.
    pub fn register_patient(
        &self,
        name: &str,
        age: Option<u32>,
        purpose: Option<&str>,
        notes: Option<&str>,
    ) -> Result<PatientRecord, ClinicError> {
        let mut db = self.db.lock()?;
        let mut queue = PatientQueue::new(&mut db, self.calendar, self.max_retries);
        Ok(queue.register(name, age, purpose, notes)?)
    }

    /// Get a patient by id.
    pub fn get_patient(&self, id: i64) -> Result<Option<PatientRecord>, ClinicError> {
        let mut db = self.db.lock()?;
        let queue = PatientQueue::new(&mut db, self.calendar, self.max_retries);
        Ok(queue.get(id)?)
    }

    // =========================================================================
    // Consultation Transitions
    // =========================================================================

    /// Start a consultation for a `Waiting` patient.
    pub fn start_consultation(&self, id: i64) -> Result<PatientRecord, ClinicError> {
        let mut db = self.db.lock()?;
        let mut queue = PatientQueue::new(&mut db, self.calendar, self.max_retries);
        Ok(queue.start(id)?)
    }

    /// Complete the active consultation for a patient.
    pub fn complete_consultation(&self, id: i64) -> Result<PatientRecord, ClinicError> {
        let mut db = self.db.lock()?;
        let mut queue = PatientQueue::new(&mut db, self.calendar, self.max_retries);
        Ok(queue.complete(id)?)
    }

    /// Cancel a `Waiting` patient.
    pub fn cancel_patient(&self, id: i64) -> Result<PatientRecord, ClinicError> {
        let mut db = self.db.lock()?;
        let mut queue = PatientQueue::new(&mut db, self.calendar, self.max_retries);
        Ok(queue.cancel(id)?)
    }

    // =========================================================================
    // Queue / Dashboard Queries
    // =========================================================================

    /// Today's queue, optionally filtered by status, in arrival order.
    pub fn list_queue(
        &self,
        status: Option<PatientStatus>,
    ) -> Result<Vec<PatientRecord>, ClinicError> {
        let mut db = self.db.lock()?;
        let queue = PatientQueue::new(&mut db, self.calendar, self.max_retries);
        Ok(queue.list_queue(status)?)
    }

    /// Today's `Waiting` patients, in arrival order.
    pub fn waiting_queue(&self) -> Result<Vec<PatientRecord>, ClinicError> {
        let mut db = self.db.lock()?;
        let queue = PatientQueue::new(&mut db, self.calendar, self.max_retries);
        Ok(queue.waiting_queue()?)
    }

    /// Per-status counts for today, all four statuses zero-filled.
    pub fn dashboard_counts(&self) -> Result<DashboardCounts, ClinicError> {
        let mut db = self.db.lock()?;
        let queue = PatientQueue::new(&mut db, self.calendar, self.max_retries);
        Ok(queue.dashboard_counts()?)
    }

    // =========================================================================
    // Tokens / Retention
    // =========================================================================

    /// The most recently issued token for today, 0 before the first issue.
    pub fn current_token(&self) -> Result<i64, ClinicError> {
        let mut db = self.db.lock()?;
        let allocator = TokenAllocator::new(&mut db, self.calendar, self.max_retries);
        Ok(allocator.current_token()?)
    }

    /// Remove patients and counters from past business days.
    pub fn cleanup_past_days(&self) -> Result<CleanupReport, ClinicError> {
        let mut db = self.db.lock()?;
        let mut queue = PatientQueue::new(&mut db, self.calendar, self.max_retries);
        Ok(queue.cleanup_past_days()?)
    }
}
