//! The engine's single error type.
//!
//! Every public operation returns `Result<_, EngineError>`. Variants map
//! directly onto the error taxonomy from the engine specification: roster
//! and bounds errors are user-correctable and surfaced verbatim, solver
//! errors are mapped to a human-readable explanation, and
//! `RegenerationImpossible` is the one case the engine itself recovers from
//! (the hard-to-soft fallback) before giving up.

use thiserror::Error;

/// Errors that can occur while building a model, running a solve, or
/// validating a request, across both public operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The roster failed normalization: self-partnership, a partner name not
    /// present in the roster, an asymmetric partnership, or an empty name
    /// after sanitization.
    #[error("invalid roster: {0}")]
    InvalidRoster(String),

    /// Fewer participants are active for this call than there are tables.
    #[error("insufficient participants: need at least {needed}, have {available}")]
    InsufficientParticipants { needed: usize, available: usize },

    /// The solver proved no assignment exists under the given hard
    /// constraints within its search budget.
    #[error("no solution exists with the given constraints: {0}")]
    InfeasibleModel(String),

    /// Internal model construction bug; should never occur in production.
    #[error("internal error: invalid model: {0}")]
    InvalidModel(String),

    /// The solver exhausted its deadline without a feasible answer.
    #[error("solver timed out before finding a feasible assignment")]
    Timeout,

    /// Both the hard-different and soft-variety regeneration attempts
    /// failed.
    #[error("regeneration impossible: {0}")]
    RegenerationImpossible(String),

    /// A request-level option was outside its documented bounds (table
    /// count, session count, roster size, time budget).
    #[error("invalid option: {0}")]
    InvalidOptions(String),
}
