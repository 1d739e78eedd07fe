//! Runtime configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::day::BusinessCalendar;

/// Default business timezone: UTC+05:30 (Asia/Kolkata, no DST).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;

/// Default bound on retries after a lost storage race.
pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid UTC offset: {0} minutes")]
    InvalidOffset(i32),
}

/// Clinic-wide settings.
///
/// Loadable from JSON by an embedding binary; all fields have defaults so an
/// empty object is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    /// Business timezone as a UTC offset in minutes (east positive).
    pub utc_offset_minutes: i32,
    /// How many times an atomic update is retried after losing a race
    /// before the error is surfaced as transient.
    pub max_conflict_retries: u32,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }
}

impl ClinicConfig {
    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Build the business-day calendar for the configured timezone.
    pub fn calendar(&self) -> Result<BusinessCalendar, ConfigError> {
        BusinessCalendar::from_offset_minutes(self.utc_offset_minutes)
            .ok_or(ConfigError::InvalidOffset(self.utc_offset_minutes))
    }
}
