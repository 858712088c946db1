//! Local-search solver driver: geometric-cooling simulated annealing over
//! [`State`] moves, standing in for the CP-SAT solve call `spec.md` section
//! 4.3 describes. See `SPEC_FULL.md` section 4.3 for the branch/conflict
//! telemetry mapping.

use crate::error::EngineError;
use crate::models::{LoggingOptions, SolutionQuality, SolveReport};
use crate::state::State;
use rand::Rng;
use std::time::{Duration, Instant};

const INITIAL_TEMPERATURE: f64 = 12.0;
const FINAL_TEMPERATURE: f64 = 0.05;
/// Iterations with no accepted improvement before the search concludes it
/// has converged and can go no further without more time.
const STALL_ITERATIONS: u64 = 20_000;

/// Runs the search until the schedule is feasible and the soft objective has
/// converged, the deadline expires, or the search stalls.
///
/// # Errors
///
/// - [`EngineError::Timeout`] if the deadline is reached with the schedule
///   still infeasible.
/// - [`EngineError::InfeasibleModel`] if the search stalls (no improving move
///   found for [`STALL_ITERATIONS`] iterations) while still infeasible, with
///   deadline remaining.
pub fn run(
    state: &mut State,
    max_time_seconds: u64,
    logging: &LoggingOptions,
    rng: &mut impl Rng,
) -> Result<SolveReport, EngineError> {
    let deadline = Duration::from_secs(max_time_seconds);
    let start = Instant::now();
    log::info!(
        "search start: sessions={} tables={} initial_cost={:.1}",
        state.num_sessions(),
        state.num_tables(),
        state.cost()
    );

    let spinner = logging.log_frequency.map(|_| {
        indicatif::ProgressBar::new_spinner().with_message("searching for a feasible seating")
    });

    let mut current_cost = state.cost();
    let mut no_improvement: u64 = 0;
    let mut iteration: u64 = 0;
    let max_iterations = estimate_max_iterations(state, max_time_seconds);

    loop {
        if state.violations() == 0 && no_improvement >= STALL_ITERATIONS.min(max_iterations / 4 + 1) {
            break;
        }
        if start.elapsed() >= deadline {
            if state.violations() > 0 {
                log::warn!("search timed out after {iteration} iterations, still infeasible");
                return Err(EngineError::Timeout);
            }
            break;
        }
        if no_improvement >= STALL_ITERATIONS {
            if state.violations() > 0 {
                log::warn!("search stalled after {iteration} iterations, still infeasible");
                return Err(EngineError::InfeasibleModel(
                    "local search converged without eliminating all hard-constraint violations"
                        .to_string(),
                ));
            }
            break;
        }
        if iteration >= max_iterations {
            break;
        }

        let movable = state.movable_cells();
        if movable.is_empty() {
            break;
        }
        let (session, p) = movable[rng.random_range(0..movable.len())];
        let targets = state.legal_targets(session, p);
        if targets.is_empty() {
            no_improvement += 1;
            iteration += 1;
            continue;
        }
        let new_table = targets[rng.random_range(0..targets.len())];

        let delta = state.evaluate_move(session, p, new_table);
        let temperature = cooling_temperature(iteration, max_iterations);
        let accept = delta < 0.0
            || (delta.is_finite() && rng.random::<f64>() < (-delta / temperature).exp());

        if accept {
            state.apply_move(session, p, new_table);
            current_cost += delta;
            if delta < -f64::EPSILON {
                no_improvement = 0;
            } else {
                no_improvement += 1;
            }
        } else {
            no_improvement += 1;
        }

        if let (Some(bar), Some(freq)) = (&spinner, logging.log_frequency) {
            if iteration % freq == 0 {
                bar.set_message(format!(
                    "iteration {iteration}: cost={current_cost:.1} violations={}",
                    state.violations()
                ));
                bar.tick();
            }
        }
        iteration += 1;
    }

    if let Some(bar) = &spinner {
        bar.finish_and_clear();
    }

    if state.violations() > 0 {
        return Err(EngineError::InfeasibleModel(
            "search ended with outstanding hard-constraint violations".to_string(),
        ));
    }

    let quality = if no_improvement >= STALL_ITERATIONS {
        SolutionQuality::Optimal
    } else {
        SolutionQuality::Feasible
    };

    if logging.log_final_score_breakdown {
        log::info!(
            "search end: iterations={iteration} final_cost={:.1} quality={:?}",
            state.cost(),
            quality
        );
    }

    Ok(SolveReport {
        quality,
        total_deviation: Some(state.cost()),
        solve_time_seconds: start.elapsed().as_secs_f64(),
        num_branches: state.moves_evaluated,
        num_conflicts: state.moves_rejected,
    })
}

/// Geometric cooling: `T(i) = T0 * (Tf / T0) ^ (i / max_iterations)`.
fn cooling_temperature(iteration: u64, max_iterations: u64) -> f64 {
    if max_iterations == 0 {
        return FINAL_TEMPERATURE;
    }
    let progress = iteration as f64 / max_iterations as f64;
    INITIAL_TEMPERATURE * (FINAL_TEMPERATURE / INITIAL_TEMPERATURE).powf(progress)
}

/// Scales the iteration budget to problem size so small instances converge
/// quickly and larger ones get proportionally more search.
fn estimate_max_iterations(state: &State, max_time_seconds: u64) -> u64 {
    let cells = (state.num_sessions() * state.num_tables()).max(1) as u64;
    (cells * 2_000).saturating_add(max_time_seconds * 5_000)
}
