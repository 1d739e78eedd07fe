//! Patient database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{DashboardCounts, PatientRecord, PatientStatus};

const PATIENT_COLUMNS: &str =
    "id, day, token_number, name, age, purpose, notes, current_status, created_at";

/// Outcome of a compare-and-swap status transition.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The swap applied; the updated record.
    Applied(PatientRecord),
    /// No record with that id.
    NotFound,
    /// The record exists but its status was not the expected one.
    WrongStatus(PatientStatus),
}

/// Outcome of an exclusive start-consultation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// The consultation started; the updated record.
    Started(PatientRecord),
    /// No record with that id.
    NotFound,
    /// The record is not `Waiting`.
    WrongStatus(PatientStatus),
    /// Another record already holds `In Consultation`.
    Busy { active_id: i64 },
}

impl Database {
    /// Insert a new patient with an allocated token, status `Waiting`.
    /// Returns the stored record with its assigned id.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_patient(
        &self,
        day: &str,
        token_number: i64,
        name: &str,
        age: Option<u32>,
        purpose: Option<&str>,
        notes: Option<&str>,
        created_at: &str,
    ) -> DbResult<PatientRecord> {
        self.conn.execute(
            r#"
            INSERT INTO patients (
                day, token_number, name, age, purpose, notes, current_status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                day,
                token_number,
                name,
                age,
                purpose,
                notes,
                PatientStatus::Waiting.as_str(),
                created_at,
            ],
        )?;

        Ok(PatientRecord {
            id: self.conn.last_insert_rowid(),
            day: day.to_string(),
            token_number,
            name: name.to_string(),
            age,
            purpose: purpose.map(str::to_string),
            notes: notes.map(str::to_string),
            current_status: PatientStatus::Waiting,
            created_at: created_at.to_string(),
        })
    }

    /// Get a patient by id.
    pub fn get_patient(&self, id: i64) -> DbResult<Option<PatientRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?"),
                [id],
                row_to_patient,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Apply a status transition only if the record currently holds the
    /// expected status. The check and the write are one atomic statement;
    /// a zero-row update is re-read to classify the failure.
    pub fn transition_status(
        &self,
        id: i64,
        expected: PatientStatus,
        to: PatientStatus,
    ) -> DbResult<TransitionOutcome> {
        let rows_affected = self.conn.execute(
            "UPDATE patients SET current_status = ?3 WHERE id = ?1 AND current_status = ?2",
            params![id, expected.as_str(), to.as_str()],
        )?;

        if rows_affected > 0 {
            return match self.get_patient(id)? {
                Some(record) => Ok(TransitionOutcome::Applied(record)),
                None => Ok(TransitionOutcome::NotFound),
            };
        }

        match self.get_patient(id)? {
            None => Ok(TransitionOutcome::NotFound),
            Some(record) => Ok(TransitionOutcome::WrongStatus(record.current_status)),
        }
    }

    /// Move a `Waiting` patient to `In Consultation`, rejecting the attempt
    /// if any other record system-wide already holds `In Consultation`.
    ///
    /// The busy check and the status swap run inside one immediate
    /// transaction, so two concurrent starts cannot both pass the check.
    pub fn start_consultation_exclusive(&mut self, id: i64) -> DbResult<StartOutcome> {
        let tx = self.exclusive_transaction()?;
        let select_sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?");

        let target = tx
            .query_row(&select_sql, [id], row_to_patient)
            .optional()?;
        let target: PatientRecord = match target {
            None => return Ok(StartOutcome::NotFound),
            Some(row) => row.try_into()?,
        };
        if target.current_status != PatientStatus::Waiting {
            return Ok(StartOutcome::WrongStatus(target.current_status));
        }

        let active: Option<i64> = tx
            .query_row(
                "SELECT id FROM patients WHERE current_status = ?1 AND id != ?2 LIMIT 1",
                params![PatientStatus::InConsultation.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(active_id) = active {
            return Ok(StartOutcome::Busy { active_id });
        }

        tx.execute(
            "UPDATE patients SET current_status = ?3 WHERE id = ?1 AND current_status = ?2",
            params![
                id,
                PatientStatus::Waiting.as_str(),
                PatientStatus::InConsultation.as_str(),
            ],
        )?;

        let updated: PatientRecord = tx
            .query_row(&select_sql, [id], row_to_patient)?
            .try_into()?;
        tx.commit()?;

        Ok(StartOutcome::Started(updated))
    }

    /// List a day's patients, optionally filtered by status, ordered by
    /// creation time with id as the deterministic tie-break.
    pub fn list_day(
        &self,
        day: &str,
        status: Option<PatientStatus>,
    ) -> DbResult<Vec<PatientRecord>> {
        let mut records = Vec::new();

        match status {
            Some(status) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {PATIENT_COLUMNS} FROM patients
                     WHERE day = ?1 AND current_status = ?2
                     ORDER BY created_at ASC, id ASC"
                ))?;
                let rows = stmt.query_map(params![day, status.as_str()], row_to_patient)?;
                for row in rows {
                    records.push(row?.try_into()?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {PATIENT_COLUMNS} FROM patients
                     WHERE day = ?1
                     ORDER BY created_at ASC, id ASC"
                ))?;
                let rows = stmt.query_map([day], row_to_patient)?;
                for row in rows {
                    records.push(row?.try_into()?);
                }
            }
        }

        Ok(records)
    }

    /// Per-status counts for a day, zero-filled for absent statuses.
    pub fn count_day_by_status(&self, day: &str) -> DbResult<DashboardCounts> {
        let mut stmt = self.conn.prepare(
            "SELECT current_status, COUNT(*) FROM patients WHERE day = ? GROUP BY current_status",
        )?;
        let rows = stmt.query_map([day], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
        })?;

        let mut counts = DashboardCounts::default();
        for row in rows {
            let (status_str, count) = row?;
            let status = PatientStatus::from_db_str(&status_str).ok_or_else(|| {
                DbError::Constraint(format!("Unknown patient status: {}", status_str))
            })?;
            counts.add(status, count);
        }
        Ok(counts)
    }

    /// Delete patients for days strictly before the cutoff. Returns the
    /// number of rows removed.
    pub fn delete_patients_before(&self, cutoff_day: &str) -> DbResult<usize> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM patients WHERE day < ?", [cutoff_day])?;
        Ok(rows_affected)
    }
}

/// Intermediate row struct for database mapping.
struct PatientRow {
    id: i64,
    day: String,
    token_number: i64,
    name: String,
    age: Option<u32>,
    purpose: Option<String>,
    notes: Option<String>,
    current_status: String,
    created_at: String,
}

fn row_to_patient(row: &Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        day: row.get(1)?,
        token_number: row.get(2)?,
        name: row.get(3)?,
        age: row.get(4)?,
        purpose: row.get(5)?,
        notes: row.get(6)?,
        current_status: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl TryFrom<PatientRow> for PatientRecord {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let current_status = PatientStatus::from_db_str(&row.current_status).ok_or_else(|| {
            DbError::Constraint(format!("Unknown patient status: {}", row.current_status))
        })?;

        Ok(PatientRecord {
            id: row.id,
            day: row.day,
            token_number: row.token_number,
            name: row.name,
            age: row.age,
            purpose: row.purpose,
            notes: row.notes,
            current_status,
            created_at: row.created_at,
        })
    }
}
