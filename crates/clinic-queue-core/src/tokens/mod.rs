//! Daily token allocation.
//!
//! Tokens are gap-free, strictly increasing integers per business day. The
//! counter lives only in the store and is mutated inside an exclusive
//! transaction, so the guarantee holds across threads and across server
//! processes sharing one database file, never in a process variable.

use std::thread;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::day::BusinessCalendar;
use crate::db::Database;

/// Token allocation errors.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DbError),

    #[error("Token allocation lost the store lock {0} times, giving up")]
    Conflict(u32),
}

pub type TokenResult<T> = Result<T, TokenError>;

/// Issues the next token for the current business day.
pub struct TokenAllocator<'a> {
    db: &'a mut Database,
    calendar: BusinessCalendar,
    max_retries: u32,
}

impl<'a> TokenAllocator<'a> {
    /// Create a new allocator.
    pub fn new(db: &'a mut Database, calendar: BusinessCalendar, max_retries: u32) -> Self {
        Self {
            db,
            calendar,
            max_retries,
        }
    }

    /// Issue the next token for today.
    ///
    /// For N concurrent calls on the same day the returned values are
    /// exactly `{K+1, ..., K+N}`: no duplicates, no gaps. A busy store is
    /// retried a bounded number of times; past that the caller gets
    /// [`TokenError::Conflict`] and nothing was persisted.
    pub fn issue_next_token(&mut self) -> TokenResult<i64> {
        let day = self.calendar.today_key();
        self.issue_token_for_day(&day)
    }

    /// Issue the next token for an explicit day key.
    pub fn issue_token_for_day(&mut self, day: &str) -> TokenResult<i64> {
        let mut attempts = 0u32;
        loop {
            let now = Utc::now().to_rfc3339();
            match self.db.allocate_token(day, &now) {
                Ok(token) => {
                    debug!(%day, token, "issued token");
                    return Ok(token);
                }
                Err(e) if e.is_busy() => {
                    attempts += 1;
                    if attempts > self.max_retries {
                        return Err(TokenError::Conflict(attempts));
                    }
                    warn!(%day, attempts, "store busy during token allocation, retrying");
                    thread::sleep(Duration::from_millis(10 * u64::from(attempts)));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// The most recently issued token for today, 0 before the first issue.
    pub fn current_token(&self) -> TokenResult<i64> {
        let day = self.calendar.today_key();
        Ok(self.db.current_token(&day)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Database, BusinessCalendar) {
        let db = Database::open_in_memory().unwrap();
        let calendar = BusinessCalendar::from_offset_minutes(330).unwrap();
        (db, calendar)
    }

    #[test]
    fn test_sequence_is_dense() {
        let (mut db, calendar) = setup();
        let mut allocator = TokenAllocator::new(&mut db, calendar, 3);

        let tokens: Vec<i64> = (0..5)
            .map(|_| allocator.issue_next_token().unwrap())
            .collect();
        assert_eq!(tokens, vec![1, 2, 3, 4, 5]);
        assert_eq!(allocator.current_token().unwrap(), 5);
    }

    #[test]
    fn test_current_token_before_first_issue() {
        let (mut db, calendar) = setup();
        let allocator = TokenAllocator::new(&mut db, calendar, 3);
        assert_eq!(allocator.current_token().unwrap(), 0);
    }

    #[test]
    fn test_days_do_not_share_sequences() {
        let (mut db, calendar) = setup();
        let mut allocator = TokenAllocator::new(&mut db, calendar, 3);

        assert_eq!(allocator.issue_token_for_day("2024-03-10").unwrap(), 1);
        assert_eq!(allocator.issue_token_for_day("2024-03-10").unwrap(), 2);
        assert_eq!(allocator.issue_token_for_day("2024-03-11").unwrap(), 1);
        assert_eq!(allocator.issue_token_for_day("2024-03-10").unwrap(), 3);
    }
}
