//! Public data types shared across the engine's two operations.
//!
//! Everything here is plain data: the engine itself is purely functional
//! (inputs in, outputs or an [`EngineError`](crate::error::EngineError) out).
//! Any cache or versioning layer a caller wants lives outside the crate and
//! talks to it only through [`crate::generate`] and
//! [`crate::regenerate_session`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A single raw roster row, the shape the Normalizer consumes.
///
/// Field names mirror the spreadsheet columns (`Name`, `Religion`, `Gender`,
/// `Partner`, `Facilitator`) rather than Rust convention, since this type's
/// whole job is to deserialize directly from upload data.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RosterRow {
    pub name: String,
    pub religion: String,
    pub gender: String,
    #[serde(default)]
    pub partner: Option<String>,
    #[serde(default)]
    pub facilitator: Option<String>,
}

/// A normalized, validated participant.
///
/// Produced only by [`crate::roster::normalize`]. `id` is 1-based and dense
/// over the roster; `couple_id` is `Some` for exactly the two participants in
/// a partnership and shared by no one else.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: u32,
    pub name: String,
    pub religion: String,
    pub gender: String,
    pub partner_name: Option<String>,
    pub couple_id: Option<u32>,
    pub is_facilitator: bool,
}

/// How the engine should decide between full and incremental generation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncrementalChoice {
    /// Use incremental solving iff `num_sessions >= 4`.
    #[default]
    Auto,
    Always,
    Never,
}

/// Options for [`crate::generate`]. Every field has a spec-mandated default;
/// construct with [`GenerateOptions::default`] and override what you need.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GenerateOptions {
    /// Total wall-clock solver budget, in \[30, 240\] seconds.
    pub max_time_seconds: u64,
    pub use_incremental: IncrementalChoice,
    /// Sessions solved per incremental batch.
    pub batch_size: usize,
    /// Session-distance threshold at which a repeat meeting is penalized.
    pub pairing_window: usize,
    /// Accepted for compatibility with the original CP-SAT worker-pool
    /// contract; the local-search driver is single-threaded and does not
    /// read this field (see `SPEC_FULL.md` section 4.3).
    pub workers: usize,
    pub logging: LoggingOptions,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        let defaults = crate::config::EngineDefaults::from_env();
        Self {
            max_time_seconds: 120,
            use_incremental: IncrementalChoice::Auto,
            batch_size: 2,
            pairing_window: defaults.pairing_window,
            workers: defaults.workers,
            logging: LoggingOptions::default(),
        }
    }
}

/// Options for [`crate::regenerate_session`].
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegenerateOptions {
    pub max_time_seconds: u64,
    pub pairing_window: usize,
    pub workers: usize,
    pub logging: LoggingOptions,
}

impl Default for RegenerateOptions {
    fn default() -> Self {
        let defaults = crate::config::EngineDefaults::from_env();
        Self {
            max_time_seconds: 120,
            pairing_window: defaults.pairing_window,
            workers: defaults.workers,
            logging: LoggingOptions::default(),
        }
    }
}

/// Progress-logging knobs for the local-search driver. Carried over from the
/// teacher's `LoggingOptions`, trimmed to the fields this engine's driver
/// actually emits.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Log a progress line every N iterations. `None` disables it.
    #[serde(default)]
    pub log_frequency: Option<u64>,
    /// Log a breakdown of the objective once the solve completes.
    #[serde(default)]
    pub log_final_score_breakdown: bool,
}

/// A participant as seen in an output assignment: just enough to seat them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ParticipantView {
    pub name: String,
    pub religion: String,
    pub gender: String,
    pub partner: Option<String>,
}

impl From<&Participant> for ParticipantView {
    fn from(p: &Participant) -> Self {
        ParticipantView {
            name: p.name.clone(),
            religion: p.religion.clone(),
            gender: p.gender.clone(),
            partner: p.partner_name.clone(),
        }
    }
}

/// One session's table assignment, 1-based session and table numbers.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SessionAssignment {
    pub session: u32,
    pub tables: BTreeMap<u32, Vec<ParticipantView>>,
    /// Participants marked absent for this session. Empty outside of
    /// regeneration.
    #[serde(default)]
    pub absent: Vec<ParticipantView>,
}

/// How a successful solve was reached.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionQuality {
    /// The search proved this is the best possible objective value.
    Optimal,
    /// A valid assignment within the deadline; optimality not proven.
    Feasible,
    /// Merged from multiple incremental batches; no single objective value
    /// is meaningful across the whole horizon.
    Incremental,
}

/// Solver telemetry, returned alongside every successful solve.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SolveReport {
    pub quality: SolutionQuality,
    /// `None` when not meaningful (incremental merges; see `SPEC_FULL.md`).
    pub total_deviation: Option<f64>,
    pub solve_time_seconds: f64,
    pub num_branches: u64,
    pub num_conflicts: u64,
}

/// The result of [`crate::generate`].
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GenerateOutput {
    pub assignments: Vec<SessionAssignment>,
    pub report: SolveReport,
}

/// The result of [`crate::regenerate_session`].
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegenerateOutput {
    pub assignments: Vec<SessionAssignment>,
    /// `true` iff the returned session is identical to the one passed in
    /// (the soft fallback concluded the existing seating was already
    /// optimal).
    pub assignments_unchanged: bool,
    pub report: SolveReport,
}

/// The fully-resolved problem the Model Builder and solver work against.
///
/// Built internally by [`crate::generate`] and
/// [`crate::regenerate_session`]; not constructed directly by callers.
#[derive(Debug, Clone)]
pub struct ProblemInstance {
    pub participants: Vec<Participant>,
    pub num_tables: usize,
    pub num_sessions: usize,
    /// `(participant_index, session_index) -> table_index`, fully pinning —
    /// every locked participant/session pair names exactly one table.
    pub locked: HashMap<(usize, usize), usize>,
    /// Canonical `(participant_id, participant_id)` pairs, `a < b`, already
    /// seated together in an earlier-fixed session.
    pub historical_pairings: HashSet<(u32, u32)>,
    /// `participant_index -> table_index` for session 0 only, used by
    /// regeneration as a forbidden or penalized set.
    pub current_table_map: HashMap<usize, usize>,
    /// Hard-forbid `current_table_map` (regeneration "must differ") vs.
    /// soft-penalize it.
    pub require_different: bool,
    pub pairing_window: usize,
    /// Unused by `search.rs`; see `GenerateOptions::workers`.
    pub workers: usize,
}
