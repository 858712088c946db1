//! # Seating-Core: Facilitated-Dialogue Table Assignment Engine
//!
//! Given a roster of participants with demographic attributes and optional
//! partner relationships, a table count `T` and a session count `S`, this
//! crate produces a per-session mapping of every participant to exactly one
//! table such that tables are size-balanced, attributes are spread evenly,
//! partners never share a table, and repeat pairings are discouraged,
//! especially between nearby sessions.
//!
//! The crate is purely functional: two entry points, [`generate`] and
//! [`regenerate_session`], take and return plain data. Any caching,
//! versioning, or HTTP surface is an external collaborator — see the
//! `seating-server` binary in this workspace for one way to build one.
//!
//! ## Quick example
//!
//! ```no_run
//! use seating_core::models::{GenerateOptions, RosterRow};
//!
//! let rows = vec![
//!     RosterRow { name: "John".into(), religion: "Christian".into(), gender: "Male".into(), partner: Some("Jane".into()), facilitator: None },
//!     RosterRow { name: "Jane".into(), religion: "Christian".into(), gender: "Female".into(), partner: Some("John".into()), facilitator: None },
//!     RosterRow { name: "Bob".into(), religion: "Jewish".into(), gender: "Male".into(), partner: None, facilitator: None },
//!     RosterRow { name: "Alice".into(), religion: "Jewish".into(), gender: "Female".into(), partner: None, facilitator: None },
//! ];
//! let output = seating_core::generate(&rows, 2, 1, &GenerateOptions::default())?;
//! assert_eq!(output.assignments.len(), 1);
//! # Ok::<(), seating_core::error::EngineError>(())
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod incremental;
pub mod models;
pub mod regenerate;
pub mod roster;
pub mod search;
pub mod state;

use error::EngineError;
use models::{
    GenerateOptions, GenerateOutput, IncrementalChoice, RegenerateOptions, RegenerateOutput,
    RosterRow, SessionAssignment, SolutionQuality, SolveReport,
};
use state::State;
use std::collections::{HashMap, HashSet};

/// Auto-incremental threshold: batched solving kicks in at `S >= 4`,
/// matching `original_source/assignment_logic/src/assignment_logic/api_handler.py`'s
/// `handle_generate_assignments` decision.
const AUTO_INCREMENTAL_THRESHOLD: usize = 4;

/// Runs a full `S`-session generation from a raw roster.
///
/// Normalizes the roster, decides between a single full-horizon solve and
/// the Incremental Scheduler's batched solve (per `options.use_incremental`),
/// and returns every session's table assignment plus solver telemetry.
///
/// # Errors
///
/// See [`EngineError`]: a malformed roster is `InvalidRoster`, an
/// out-of-bounds `num_tables`/`num_sessions`/roster size/time budget is
/// `InvalidOptions`, and anything the search itself can't satisfy surfaces
/// as `InfeasibleModel` or `Timeout`.
pub fn generate(
    rows: &[RosterRow],
    num_tables: usize,
    num_sessions: usize,
    options: &GenerateOptions,
) -> Result<GenerateOutput, EngineError> {
    config::validate_bounds(num_tables, num_sessions, rows.len(), options.max_time_seconds)?;
    let participants = roster::normalize(rows)?;
    if participants.len() < num_tables {
        return Err(EngineError::InsufficientParticipants {
            needed: num_tables,
            available: participants.len(),
        });
    }

    let use_incremental = match options.use_incremental {
        IncrementalChoice::Always => true,
        IncrementalChoice::Never => false,
        IncrementalChoice::Auto => num_sessions >= AUTO_INCREMENTAL_THRESHOLD,
    };

    let mut rng = rand::rng();

    if use_incremental {
        log::info!(
            "generate: {} participants, {num_tables} tables, {num_sessions} sessions, incremental",
            participants.len()
        );
        let (schedule, report) = incremental::solve_incremental(
            &participants,
            num_tables,
            num_sessions,
            options.batch_size,
            options.max_time_seconds,
            options.pairing_window,
            options.workers,
            &options.logging,
            &mut rng,
        )?;
        let assignments = decode::decode_sparse(&schedule, &participants, num_sessions);
        Ok(GenerateOutput { assignments, report })
    } else {
        log::info!(
            "generate: {} participants, {num_tables} tables, {num_sessions} sessions, full solve",
            participants.len()
        );
        let problem = models::ProblemInstance {
            participants: participants.clone(),
            num_tables,
            num_sessions,
            locked: HashMap::new(),
            historical_pairings: HashSet::new(),
            current_table_map: HashMap::new(),
            require_different: false,
            pairing_window: options.pairing_window,
            workers: options.workers,
        };
        let mut state = State::new(&problem, &mut rng)?;
        let report = search::run(&mut state, options.max_time_seconds, &options.logging, &mut rng)?;
        let assignments = decode::decode(state.schedule(), &participants, &[]);
        Ok(GenerateOutput { assignments, report })
    }
}

/// Re-solves a single session of an already-generated schedule.
///
/// Derives the active participant list (roster minus `absent`), the
/// historical pairings from every session other than `k`, and the current
/// table map for session `k`, then attempts a hard-different solve and falls
/// back to a soft-variety solve exactly once if that fails.
///
/// `k` is 1-based (`1 <= k <= existing.len()`), matching [`generate`]'s
/// 1-based session numbering in [`SessionAssignment`].
///
/// # Errors
///
/// [`EngineError::RegenerationImpossible`] if both the hard-different and
/// soft-variety attempts fail; see [`regenerate::regenerate_session`] for the
/// full error taxonomy.
pub fn regenerate_session(
    existing: &[SessionAssignment],
    rows: &[RosterRow],
    k: u32,
    absent: &[String],
    num_tables: usize,
    options: &RegenerateOptions,
) -> Result<RegenerateOutput, EngineError> {
    let participants = roster::normalize(rows)?;
    let mut rng = rand::rng();
    regenerate::regenerate_session(existing, &participants, k, absent, num_tables, options, &mut rng)
}

/// A convenience constructor mirroring the spec's "auto" default when a
/// caller doesn't care how `solution_quality` was reached.
pub fn is_success(report: &SolveReport) -> bool {
    matches!(
        report.quality,
        SolutionQuality::Optimal | SolutionQuality::Feasible | SolutionQuality::Incremental
    )
}
