//! Bounds validation and environment-overridable defaults.
//!
//! The numeric ranges here are the surface-level bounds from the engine's
//! external API contract, not engine limits: the Model Builder and solver
//! will happily attempt a larger problem if asked directly.

use crate::error::EngineError;

pub const MIN_TABLES: usize = 1;
pub const MAX_TABLES: usize = 10;
pub const MIN_SESSIONS: usize = 1;
pub const MAX_SESSIONS: usize = 6;
pub const MAX_PARTICIPANTS: usize = 200;
pub const MIN_TIME_SECONDS: u64 = 30;
pub const MAX_TIME_SECONDS: u64 = 240;

/// Checks `T`, `S`, roster size, and the solver time budget against the
/// documented bounds. Called before roster normalization so a bad request
/// fails fast without doing any normalization work.
pub fn validate_bounds(
    num_tables: usize,
    num_sessions: usize,
    num_participants: usize,
    max_time_seconds: u64,
) -> Result<(), EngineError> {
    if !(MIN_TABLES..=MAX_TABLES).contains(&num_tables) {
        return Err(EngineError::InvalidOptions(format!(
            "num_tables must be between {MIN_TABLES} and {MAX_TABLES}, got {num_tables}"
        )));
    }
    if !(MIN_SESSIONS..=MAX_SESSIONS).contains(&num_sessions) {
        return Err(EngineError::InvalidOptions(format!(
            "num_sessions must be between {MIN_SESSIONS} and {MAX_SESSIONS}, got {num_sessions}"
        )));
    }
    if num_participants > MAX_PARTICIPANTS {
        return Err(EngineError::InvalidOptions(format!(
            "at most {MAX_PARTICIPANTS} participants are supported, got {num_participants}"
        )));
    }
    if !(MIN_TIME_SECONDS..=MAX_TIME_SECONDS).contains(&max_time_seconds) {
        return Err(EngineError::InvalidOptions(format!(
            "max_time_seconds must be between {MIN_TIME_SECONDS} and {MAX_TIME_SECONDS}, got {max_time_seconds}"
        )));
    }
    Ok(())
}

/// Defaults overridable via environment variables, mirroring
/// `SOLVER_PAIRING_WINDOW` / `SOLVER_NUM_WORKERS` from the original
/// implementation's `GroupBuilder.__init__`.
#[derive(Debug, Clone, Copy)]
pub struct EngineDefaults {
    pub pairing_window: usize,
    pub workers: usize,
}

impl EngineDefaults {
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var("SOLVER_PAIRING_WINDOW").ok(),
            std::env::var("SOLVER_NUM_WORKERS").ok(),
        )
    }

    /// Pure core of [`EngineDefaults::from_env`], split out so the parsing
    /// logic is testable without mutating process-global environment state.
    fn from_values(pairing_window: Option<String>, workers: Option<String>) -> Self {
        Self {
            pairing_window: pairing_window.and_then(|v| v.parse().ok()).unwrap_or(3),
            workers: workers.and_then(|v| v.parse().ok()).unwrap_or(4),
        }
    }
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            pairing_window: 3,
            workers: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_boundary_values() {
        assert!(validate_bounds(MIN_TABLES, MIN_SESSIONS, 1, MIN_TIME_SECONDS).is_ok());
        assert!(validate_bounds(MAX_TABLES, MAX_SESSIONS, MAX_PARTICIPANTS, MAX_TIME_SECONDS).is_ok());
    }

    #[test]
    fn rejects_out_of_range_tables() {
        assert!(validate_bounds(0, 1, 1, 60).is_err());
        assert!(validate_bounds(11, 1, 1, 60).is_err());
    }

    #[test]
    fn rejects_out_of_range_sessions() {
        assert!(validate_bounds(2, 0, 1, 60).is_err());
        assert!(validate_bounds(2, 7, 1, 60).is_err());
    }

    #[test]
    fn rejects_too_many_participants() {
        assert!(validate_bounds(2, 2, 201, 60).is_err());
    }

    #[test]
    fn rejects_out_of_range_time_budget() {
        assert!(validate_bounds(2, 2, 10, 29).is_err());
        assert!(validate_bounds(2, 2, 10, 241).is_err());
    }

    #[test]
    fn defaults_fall_back_when_unset() {
        let d = EngineDefaults::from_values(None, None);
        assert_eq!(d.pairing_window, 3);
        assert_eq!(d.workers, 4);
    }

    #[test]
    fn defaults_parse_overrides() {
        let d = EngineDefaults::from_values(Some("5".to_string()), Some("8".to_string()));
        assert_eq!(d.pairing_window, 5);
        assert_eq!(d.workers, 8);
    }

    #[test]
    fn defaults_ignore_unparseable_overrides() {
        let d = EngineDefaults::from_values(Some("not-a-number".to_string()), None);
        assert_eq!(d.pairing_window, 3);
    }
}
