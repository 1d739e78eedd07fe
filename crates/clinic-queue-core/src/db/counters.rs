//! Daily counter database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::DailyCounter;

impl Database {
    /// Atomically issue the next token for a day.
    ///
    /// Runs the whole read-increment-write under an immediate transaction:
    /// the first caller of a new day creates the counter at 1, every later
    /// caller reads the current value and writes exactly +1. If the commit
    /// fails nothing is persisted and no token is considered issued.
    pub fn allocate_token(&mut self, day: &str, now: &str) -> DbResult<i64> {
        let tx = self.exclusive_transaction()?;

        let last: Option<i64> = tx
            .query_row(
                "SELECT last_token FROM daily_counters WHERE day = ?",
                [day],
                |row| row.get(0),
            )
            .optional()?;

        let next = match last {
            None => {
                tx.execute(
                    "INSERT INTO daily_counters (day, last_token, updated_at) VALUES (?1, 1, ?2)",
                    params![day, now],
                )?;
                1
            }
            Some(last) => {
                tx.execute(
                    "UPDATE daily_counters SET last_token = ?2, updated_at = ?3 WHERE day = ?1",
                    params![day, last + 1, now],
                )?;
                last + 1
            }
        };

        tx.commit()?;
        Ok(next)
    }

    /// The most recently issued token for a day, 0 if none yet.
    pub fn current_token(&self, day: &str) -> DbResult<i64> {
        let last: Option<i64> = self
            .conn
            .query_row(
                "SELECT last_token FROM daily_counters WHERE day = ?",
                [day],
                |row| row.get(0),
            )
            .optional()?;
        Ok(last.unwrap_or(0))
    }

    /// Get the full counter row for a day.
    pub fn get_counter(&self, day: &str) -> DbResult<Option<DailyCounter>> {
        self.conn
            .query_row(
                "SELECT day, last_token, updated_at FROM daily_counters WHERE day = ?",
                [day],
                |row| {
                    Ok(DailyCounter {
                        day: row.get(0)?,
                        last_token: row.get(1)?,
                        updated_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Delete counters for days strictly before the cutoff. Returns the
    /// number of rows removed.
    pub fn delete_counters_before(&self, cutoff_day: &str) -> DbResult<usize> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM daily_counters WHERE day < ?", [cutoff_day])?;
        Ok(rows_affected)
    }
}
