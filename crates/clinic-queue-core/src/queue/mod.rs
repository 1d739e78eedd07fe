//! Patient queue operations.
//!
//! Front desk and doctor both drive the queue through this module:
//! registration issues a token and inserts a `Waiting` record; the doctor
//! moves records along the status state machine; both views read the same
//! day-scoped queries. Nothing here caches; every read hits the store.

use std::thread;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::day::BusinessCalendar;
use crate::db::{Database, StartOutcome, TransitionOutcome};
use crate::models::{CleanupReport, DashboardCounts, PatientRecord, PatientStatus};
use crate::tokens::{TokenAllocator, TokenError};

/// Queue operation errors.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No patient with id {0}")]
    NotFound(i64),

    #[error("Rejected transition for patient {id}: cannot {attempted} from status {from}")]
    InvalidTransition {
        id: i64,
        from: PatientStatus,
        attempted: &'static str,
    },

    #[error("Consultation already active for patient {active_id}")]
    ConsultationActive { active_id: i64 },

    #[error("Transition for patient {id} lost the store lock {attempts} times, giving up")]
    Conflict { id: i64, attempts: u32 },

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

pub type QueueResult<T> = Result<T, QueueError>;

/// Coordinates token allocation, the status state machine, and day-scoped
/// queries over one store.
pub struct PatientQueue<'a> {
    db: &'a mut Database,
    calendar: BusinessCalendar,
    max_retries: u32,
}

impl<'a> PatientQueue<'a> {
    /// Create a new queue over the given store.
    pub fn new(db: &'a mut Database, calendar: BusinessCalendar, max_retries: u32) -> Self {
        Self {
            db,
            calendar,
            max_retries,
        }
    }

    /// Register a patient into today's queue.
    ///
    /// Allocates the next token, then inserts the record as `Waiting`. If
    /// the insert fails after allocation the token is burned: a retry
    /// derives a fresh token rather than reusing the old number, so a token
    /// can never reach two records.
    pub fn register(
        &mut self,
        name: &str,
        age: Option<u32>,
        purpose: Option<&str>,
        notes: Option<&str>,
    ) -> QueueResult<PatientRecord> {
        let name = name.trim();
        if name.is_empty() {
            return Err(QueueError::Validation(
                "patient name must not be empty".into(),
            ));
        }

        let day = self.calendar.today_key();
        let token_number =
            TokenAllocator::new(self.db, self.calendar, self.max_retries)
                .issue_token_for_day(&day)?;

        let created_at = Utc::now().to_rfc3339();
        let record = self.db.insert_patient(
            &day,
            token_number,
            name,
            age,
            purpose,
            notes,
            &created_at,
        )?;

        info!(id = record.id, token_number, %day, "registered patient");
        Ok(record)
    }

    /// Get a patient by id.
    pub fn get(&self, id: i64) -> QueueResult<Option<PatientRecord>> {
        Ok(self.db.get_patient(id)?)
    }

    /// Start a consultation for a `Waiting` patient.
    ///
    /// Rejected while another consultation is active anywhere in the system:
    /// the doctor sees one patient at a time, and the active record is never
    /// silently demoted.
    pub fn start(&mut self, id: i64) -> QueueResult<PatientRecord> {
        let mut attempts = 0u32;
        let outcome = loop {
            match self.db.start_consultation_exclusive(id) {
                Ok(outcome) => break outcome,
                Err(e) if e.is_busy() => {
                    attempts += 1;
                    if attempts > self.max_retries {
                        return Err(QueueError::Conflict { id, attempts });
                    }
                    warn!(id, attempts, "store busy during start, retrying");
                    thread::sleep(Duration::from_millis(10 * u64::from(attempts)));
                }
                Err(e) => return Err(e.into()),
            }
        };

        match outcome {
            StartOutcome::Started(record) => {
                info!(id, token_number = record.token_number, "consultation started");
                Ok(record)
            }
            StartOutcome::NotFound => Err(QueueError::NotFound(id)),
            StartOutcome::WrongStatus(from) => Err(QueueError::InvalidTransition {
                id,
                from,
                attempted: "start",
            }),
            StartOutcome::Busy { active_id } => {
                Err(QueueError::ConsultationActive { active_id })
            }
        }
    }

    /// Complete an active consultation.
    pub fn complete(&mut self, id: i64) -> QueueResult<PatientRecord> {
        self.transition(
            id,
            PatientStatus::InConsultation,
            PatientStatus::Completed,
            "complete",
        )
    }

    /// Cancel a `Waiting` patient (no-shows, front-desk errors).
    pub fn cancel(&mut self, id: i64) -> QueueResult<PatientRecord> {
        self.transition(id, PatientStatus::Waiting, PatientStatus::Cancelled, "cancel")
    }

    fn transition(
        &mut self,
        id: i64,
        expected: PatientStatus,
        to: PatientStatus,
        attempted: &'static str,
    ) -> QueueResult<PatientRecord> {
        match self.db.transition_status(id, expected, to)? {
            TransitionOutcome::Applied(record) => {
                info!(id, status = %to, "patient status changed");
                Ok(record)
            }
            TransitionOutcome::NotFound => Err(QueueError::NotFound(id)),
            TransitionOutcome::WrongStatus(from) => Err(QueueError::InvalidTransition {
                id,
                from,
                attempted,
            }),
        }
    }

    /// Today's queue, optionally filtered by status, in arrival order.
    pub fn list_queue(&self, status: Option<PatientStatus>) -> QueueResult<Vec<PatientRecord>> {
        let day = self.calendar.today_key();
        Ok(self.db.list_day(&day, status)?)
    }

    /// Today's `Waiting` patients, in arrival order.
    pub fn waiting_queue(&self) -> QueueResult<Vec<PatientRecord>> {
        self.list_queue(Some(PatientStatus::Waiting))
    }

    /// Per-status counts for today, all four statuses zero-filled.
    pub fn dashboard_counts(&self) -> QueueResult<DashboardCounts> {
        let day = self.calendar.today_key();
        Ok(self.db.count_day_by_status(&day)?)
    }

    /// Remove patients and counters from past business days.
    ///
    /// Touches only rows with `day < today`, so it is idempotent and safe
    /// to run while registrations and transitions are in flight.
    pub fn cleanup_past_days(&mut self) -> QueueResult<CleanupReport> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let cutoff_day = self.calendar.today_key();

        let patients_deleted = self.db.delete_patients_before(&cutoff_day)?;
        let counters_deleted = self.db.delete_counters_before(&cutoff_day)?;

        let report = CleanupReport {
            run_id,
            cutoff_day,
            patients_deleted,
            counters_deleted,
        };
        if report.patients_deleted > 0 || report.counters_deleted > 0 {
            info!(
                run_id = %report.run_id,
                cutoff_day = %report.cutoff_day,
                patients = report.patients_deleted,
                counters = report.counters_deleted,
                "retention cleanup removed past-day rows"
            );
        } else {
            debug!(run_id = %report.run_id, "retention cleanup found nothing to remove");
        }
        Ok(report)
    }
}
