//! SQLite schema definition.

/// Complete database schema for the clinic queue.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Daily Token Counters
-- ============================================================================

-- One row per business day. last_token is mutated only inside an immediate
-- transaction; it equals the number of tokens issued for that day.
CREATE TABLE IF NOT EXISTS daily_counters (
    day TEXT PRIMARY KEY,                        -- business day, YYYY-MM-DD
    last_token INTEGER NOT NULL DEFAULT 0 CHECK (last_token >= 0),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY,
    day TEXT NOT NULL,                           -- business day, YYYY-MM-DD
    token_number INTEGER NOT NULL CHECK (token_number >= 1),
    name TEXT NOT NULL,
    age INTEGER CHECK (age IS NULL OR age >= 0),
    purpose TEXT,
    notes TEXT,
    current_status TEXT NOT NULL DEFAULT 'Waiting'
        CHECK (current_status IN ('Waiting', 'In Consultation', 'Completed', 'Cancelled')),
    created_at TEXT NOT NULL,
    UNIQUE (day, token_number)
);

CREATE INDEX IF NOT EXISTS idx_patients_day ON patients(day);
CREATE INDEX IF NOT EXISTS idx_patients_day_status ON patients(day, current_status);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_duplicate_token_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO patients (day, token_number, name, created_at) VALUES (?, 1, 'Asha', ?)",
            ["2024-03-10", "2024-03-10T04:00:00+00:00"],
        )
        .unwrap();

        // Same token on the same day must fail
        let result = conn.execute(
            "INSERT INTO patients (day, token_number, name, created_at) VALUES (?, 1, 'Ravi', ?)",
            ["2024-03-10", "2024-03-10T04:01:00+00:00"],
        );
        assert!(result.is_err());

        // Same token on another day is fine
        let result = conn.execute(
            "INSERT INTO patients (day, token_number, name, created_at) VALUES (?, 1, 'Ravi', ?)",
            ["2024-03-11", "2024-03-11T04:01:00+00:00"],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_unknown_status_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO patients (day, token_number, name, current_status, created_at)
             VALUES ('2024-03-10', 1, 'Asha', 'waiting', '2024-03-10T04:00:00+00:00')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_counter_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO daily_counters (day, last_token) VALUES ('2024-03-10', -1)",
            [],
        );
        assert!(result.is_err());
    }
}
