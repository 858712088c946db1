//! Single-Session Regenerator: re-solves one session against the rest of an
//! existing schedule, with hard-different vs. soft-variety fallback.
//!
//! Grounded on `original_source/api/src/api/routers/assignments.py`'s
//! `regenerate_single_session` endpoint body (steps 1-6) and its helpers
//! `_extract_pairings_from_sessions`, `_get_active_participants`,
//! `_extract_current_table_assignments`, pulled into the engine itself since
//! they are pure functions over engine data types with no I/O of their own.

use crate::decode::decode;
use crate::error::EngineError;
use crate::models::{
    Participant, ParticipantView, ProblemInstance, RegenerateOptions, RegenerateOutput,
    SessionAssignment, SolveReport,
};
use crate::state::State;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Regenerates session `k` (1-based) of `existing`, leaving every other
/// session untouched.
///
/// # Errors
///
/// - [`EngineError::InvalidOptions`] if `k` is out of `1..=existing.len()`.
/// - [`EngineError::InsufficientParticipants`] if fewer active participants
///   remain than there are tables.
/// - [`EngineError::RegenerationImpossible`] if both the hard-different and
///   soft-variety attempts fail.
pub fn regenerate_session(
    existing: &[SessionAssignment],
    participants: &[Participant],
    k: u32,
    absent: &[String],
    num_tables: usize,
    options: &RegenerateOptions,
    rng: &mut impl Rng,
) -> Result<RegenerateOutput, EngineError> {
    let session_count = existing.len();
    if k == 0 || (k as usize) > session_count {
        return Err(EngineError::InvalidOptions(format!(
            "session {k} is out of range 1..={session_count}"
        )));
    }
    let target_idx = (k - 1) as usize;

    let absent_set: HashSet<&str> = absent.iter().map(String::as_str).collect();
    let active: Vec<&Participant> = participants
        .iter()
        .filter(|p| !absent_set.contains(p.name.as_str()))
        .collect();
    if active.len() < num_tables {
        return Err(EngineError::InsufficientParticipants {
            needed: num_tables,
            available: active.len(),
        });
    }
    let active_participants: Vec<Participant> = active.iter().map(|&p| p.clone()).collect();
    let active_ids: HashSet<u32> = active_participants.iter().map(|p| p.id).collect();

    let name_to_id: HashMap<&str, u32> =
        participants.iter().map(|p| (p.name.as_str(), p.id)).collect();

    let historical_pairings = extract_pairings_excluding(existing, target_idx, &name_to_id, &active_ids);
    let current_table_map =
        extract_current_tables(&existing[target_idx], &active_participants, &name_to_id);

    let absent_views: Vec<ParticipantView> = participants
        .iter()
        .filter(|p| absent_set.contains(p.name.as_str()))
        .map(ParticipantView::from)
        .collect();

    let hard_problem = ProblemInstance {
        participants: active_participants.clone(),
        num_tables,
        num_sessions: 1,
        locked: HashMap::new(),
        historical_pairings: historical_pairings.clone(),
        current_table_map: current_table_map.clone(),
        require_different: true,
        pairing_window: options.pairing_window,
        workers: options.workers,
    };

    log::info!("regenerating session {k}: trying hard-different mode");
    let hard_attempt = solve_single_session(&hard_problem, options, rng);

    let ((report, state), assignments_unchanged) = match hard_attempt {
        Ok(solved) => (solved, false),
        Err(hard_err) => {
            log::warn!("hard-different regeneration failed ({hard_err}), falling back to soft-variety");
            let soft_problem = ProblemInstance {
                require_different: false,
                ..hard_problem
            };
            match solve_single_session(&soft_problem, options, rng) {
                Ok(solved) => (solved, true),
                Err(soft_err) => {
                    return Err(EngineError::RegenerationImpossible(format!(
                        "hard-different failed ({hard_err}); soft-variety also failed ({soft_err})"
                    )));
                }
            }
        }
    };

    let mut new_session = decode(state.schedule(), &active_participants, &absent_views)
        .into_iter()
        .next()
        .expect("single-session model decodes to exactly one session");
    new_session.session = k;

    let mut assignments: Vec<SessionAssignment> = existing.to_vec();
    assignments[target_idx] = new_session;

    Ok(RegenerateOutput {
        assignments,
        assignments_unchanged,
        report,
    })
}

/// Builds and solves the single-session model, returning both the report and
/// the solved state so the caller can decode the schedule.
fn solve_single_session(
    problem: &ProblemInstance,
    options: &RegenerateOptions,
    rng: &mut impl Rng,
) -> Result<(SolveReport, State), EngineError> {
    let mut state = State::new(problem, rng)?;
    let report = crate::search::run(&mut state, options.max_time_seconds, &options.logging, rng)?;
    Ok((report, state))
}

fn extract_pairings_excluding(
    existing: &[SessionAssignment],
    exclude_idx: usize,
    name_to_id: &HashMap<&str, u32>,
    active_ids: &HashSet<u32>,
) -> HashSet<(u32, u32)> {
    let mut pairings = HashSet::new();
    for (idx, session) in existing.iter().enumerate() {
        if idx == exclude_idx {
            continue;
        }
        for members in session.tables.values() {
            let ids: Vec<u32> = members
                .iter()
                .filter_map(|m| name_to_id.get(m.name.as_str()).copied())
                .filter(|id| active_ids.contains(id))
                .collect();
            for i in 0..ids.len() {
                for j in (i + 1)..ids.len() {
                    let (a, b) = (ids[i], ids[j]);
                    pairings.insert(if a < b { (a, b) } else { (b, a) });
                }
            }
        }
    }
    pairings
}

fn extract_current_tables(
    session: &SessionAssignment,
    active_participants: &[Participant],
    name_to_id: &HashMap<&str, u32>,
) -> HashMap<usize, usize> {
    let id_to_active_idx: HashMap<u32, usize> = active_participants
        .iter()
        .enumerate()
        .map(|(idx, p)| (p.id, idx))
        .collect();
    let mut map = HashMap::new();
    for (&table_no, members) in &session.tables {
        for member in members {
            if let Some(&id) = name_to_id.get(member.name.as_str()) {
                if let Some(&active_idx) = id_to_active_idx.get(&id) {
                    map.insert(active_idx, (table_no - 1) as usize);
                }
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParticipantView;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::BTreeMap;

    fn participant(id: u32, name: &str, religion: &str, couple_id: Option<u32>, partner: Option<&str>) -> Participant {
        Participant {
            id,
            name: name.to_string(),
            religion: religion.to_string(),
            gender: "Female".to_string(),
            partner_name: partner.map(str::to_string),
            couple_id,
            is_facilitator: false,
        }
    }

    fn view(p: &Participant) -> ParticipantView {
        ParticipantView::from(p)
    }

    #[test]
    fn rejects_out_of_range_session() {
        let participants = vec![participant(1, "A", "Christian", None, None)];
        let existing = vec![SessionAssignment {
            session: 1,
            tables: BTreeMap::new(),
            absent: vec![],
        }];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = regenerate_session(
            &existing,
            &participants,
            2,
            &[],
            1,
            &RegenerateOptions::default(),
            &mut rng,
        );
        assert!(matches!(result, Err(EngineError::InvalidOptions(_))));
    }

    #[test]
    fn hard_different_changes_every_participants_table() {
        let participants = vec![
            participant(1, "A", "Christian", None, None),
            participant(2, "B", "Jewish", None, None),
            participant(3, "C", "Christian", None, None),
            participant(4, "D", "Jewish", None, None),
        ];
        let mut tables = BTreeMap::new();
        tables.insert(1, vec![view(&participants[0]), view(&participants[1])]);
        tables.insert(2, vec![view(&participants[2]), view(&participants[3])]);
        let existing = vec![SessionAssignment {
            session: 1,
            tables,
            absent: vec![],
        }];
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let options = RegenerateOptions::default();
        let output = regenerate_session(&existing, &participants, 1, &[], 2, &options, &mut rng).unwrap();
        assert_eq!(output.assignments.len(), 1);
        if !output.assignments_unchanged {
            for members in output.assignments[0].tables.values() {
                for m in members {
                    let original_table = existing[0]
                        .tables
                        .iter()
                        .find(|(_, v)| v.iter().any(|pv| pv.name == m.name))
                        .map(|(t, _)| *t);
                    let new_table = output.assignments[0]
                        .tables
                        .iter()
                        .find(|(_, v)| v.iter().any(|pv| pv.name == m.name))
                        .map(|(t, _)| *t);
                    assert_ne!(original_table, new_table);
                }
            }
        }
    }

    #[test]
    fn single_table_makes_couple_separation_permanently_impossible() {
        let participants = vec![
            participant(1, "John", "Christian", Some(1), Some("Jane")),
            participant(2, "Jane", "Christian", Some(1), Some("John")),
        ];
        let mut tables = BTreeMap::new();
        tables.insert(1, vec![view(&participants[0])]);
        tables.insert(2, vec![view(&participants[1])]);
        let existing = vec![SessionAssignment {
            session: 1,
            tables,
            absent: vec![],
        }];
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut options = RegenerateOptions::default();
        options.max_time_seconds = 30;
        // A single table cannot separate a couple under any arrangement, so
        // both the hard-different and soft-variety attempts are infeasible.
        let result = regenerate_session(&existing, &participants, 1, &[], 1, &options, &mut rng);
        assert!(matches!(result, Err(EngineError::RegenerationImpossible(_))));
    }

    /// A two-table couple whose current seating already has them sharing a
    /// table. Hard-different forbids that shared table for both of them, and
    /// with only one table left, that forces them right back together — a
    /// genuine forced collision, not the trivially-impossible single-table
    /// case above. Soft-variety then has no hard constraint to fight and
    /// splits them, at the cost of one participant losing the "moved from
    /// current table" bonus.
    #[test]
    fn hard_forced_collision_at_two_tables_recovers_via_soft_fallback() {
        let participants = vec![
            participant(1, "John", "Christian", Some(1), Some("Jane")),
            participant(2, "Jane", "Christian", Some(1), Some("John")),
        ];
        let mut tables = BTreeMap::new();
        tables.insert(1, vec![view(&participants[0]), view(&participants[1])]);
        tables.insert(2, vec![]);
        let existing = vec![SessionAssignment {
            session: 1,
            tables,
            absent: vec![],
        }];
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let mut options = RegenerateOptions::default();
        options.max_time_seconds = 30;
        let output = regenerate_session(&existing, &participants, 1, &[], 2, &options, &mut rng)
            .expect("soft fallback separates the couple once hard-different is dropped");
        let john_table = output.assignments[0]
            .tables
            .iter()
            .find(|(_, v)| v.iter().any(|m| m.name == "John"))
            .map(|(t, _)| *t);
        let jane_table = output.assignments[0]
            .tables
            .iter()
            .find(|(_, v)| v.iter().any(|m| m.name == "Jane"))
            .map(|(t, _)| *t);
        assert_ne!(john_table, jane_table);
    }
}
