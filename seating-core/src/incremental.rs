//! Incremental Scheduler: solves large `S`-session problems batch by batch,
//! fixing earlier sessions and carrying forward a growing historical-pairing
//! set so later batches still pay a cost for repeating an early pairing.
//!
//! Grounded on `group_builder.py`'s `generate_assignments_incremental`,
//! `_calculate_batch_timeouts`, `_track_historical_pairings`, and
//! `_lock_batch_assignments`: the batch loop, the 50/50 first-batch timeout
//! split, and the locked/historical accumulation are ported step for step.

use crate::error::EngineError;
use crate::models::{LoggingOptions, Participant, SolutionQuality, SolveReport};
use crate::state::State;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Splits the total deadline across batches: the first batch (no fixed
/// history yet, typically hardest) gets half; the rest share the remainder
/// equally. A single batch gets the whole deadline.
pub fn batch_timeouts(num_batches: usize, max_time_seconds: u64) -> Vec<u64> {
    if num_batches <= 1 {
        return vec![max_time_seconds];
    }
    let first = (max_time_seconds as f64 * 0.5).round() as u64;
    let remaining_batches = num_batches - 1;
    let remaining = max_time_seconds.saturating_sub(first);
    let each = (remaining / remaining_batches as u64).max(1);
    let mut timeouts = vec![first];
    timeouts.extend(std::iter::repeat(each).take(remaining_batches));
    timeouts
}

/// Runs the full batch loop and returns the merged output.
///
/// # Errors
///
/// Returns the first failing batch's error verbatim; no partial assignments
/// are produced (`spec.md` section 4.4, step 5).
pub fn solve_incremental(
    participants: &[Participant],
    num_tables: usize,
    num_sessions: usize,
    batch_size: usize,
    max_time_seconds: u64,
    pairing_window: usize,
    workers: usize,
    logging: &LoggingOptions,
    rng: &mut impl Rng,
) -> Result<(HashMap<(usize, usize), usize>, SolveReport), EngineError> {
    let num_batches = num_sessions.div_ceil(batch_size);
    let timeouts = batch_timeouts(num_batches, max_time_seconds);

    let mut locked: HashMap<(usize, usize), usize> = HashMap::new();
    let mut history: HashSet<(u32, u32)> = HashSet::new();
    let mut full_schedule: HashMap<(usize, usize), usize> = HashMap::new();
    let mut total_solve_time = 0.0;
    let mut total_branches = 0u64;
    let mut total_conflicts = 0u64;
    let mut end = 0;

    for (k, &batch_timeout) in timeouts.iter().enumerate() {
        let start = k * batch_size;
        end = (start + batch_size).min(num_sessions);
        log::info!("incremental batch {k}: sessions {start}..{end}, timeout={batch_timeout}s");

        let problem = crate::models::ProblemInstance {
            participants: participants.to_vec(),
            num_tables,
            num_sessions: end,
            locked: locked.clone(),
            historical_pairings: history.clone(),
            current_table_map: HashMap::new(),
            require_different: false,
            pairing_window,
            workers,
        };

        let mut state = State::new(&problem, rng)?;
        let report = crate::search::run(&mut state, batch_timeout, logging, rng)?;

        total_solve_time += report.solve_time_seconds;
        total_branches += report.num_branches;
        total_conflicts += report.num_conflicts;

        for session in start..end {
            for p_idx in 0..participants.len() {
                let table = state.table_of(session, p_idx);
                full_schedule.insert((session, p_idx), table);
                locked.insert((p_idx, session), table);
            }
        }

        for session in start..end {
            for a in 0..participants.len() {
                for b in (a + 1)..participants.len() {
                    if state.table_of(session, a) == state.table_of(session, b) {
                        let (id_a, id_b) = (participants[a].id, participants[b].id);
                        let key = if id_a < id_b { (id_a, id_b) } else { (id_b, id_a) };
                        history.insert(key);
                    }
                }
            }
        }

        if end == num_sessions {
            break;
        }
    }

    let report = SolveReport {
        quality: SolutionQuality::Incremental,
        total_deviation: None,
        solve_time_seconds: total_solve_time,
        num_branches: total_branches,
        num_conflicts: total_conflicts,
    };
    Ok((full_schedule, report))
}
