//! Result Decoder: turns a solved schedule into the public
//! `Vec<SessionAssignment>` shape, table-number order, 1-based externally.

use crate::models::{Participant, ParticipantView, SessionAssignment};
use std::collections::BTreeMap;

/// Decodes `schedule[session][participant_idx] = table_idx` into per-session
/// `table -> [participant view]` maps, 1-based session and table numbers.
pub fn decode(
    schedule: &[Vec<usize>],
    participants: &[Participant],
    absent: &[ParticipantView],
) -> Vec<SessionAssignment> {
    schedule
        .iter()
        .enumerate()
        .map(|(session_idx, table_of)| {
            let mut tables: BTreeMap<u32, Vec<ParticipantView>> = BTreeMap::new();
            for (p_idx, &table_idx) in table_of.iter().enumerate() {
                tables
                    .entry((table_idx + 1) as u32)
                    .or_default()
                    .push(ParticipantView::from(&participants[p_idx]));
            }
            SessionAssignment {
                session: (session_idx + 1) as u32,
                tables,
                absent: if session_idx == 0 { absent.to_vec() } else { Vec::new() },
            }
        })
        .collect()
}

/// Decodes a single batch's sparse `(session, participant_idx) -> table_idx`
/// map (as produced by the Incremental Scheduler) into dense per-session
/// assignments.
pub fn decode_sparse(
    schedule: &std::collections::HashMap<(usize, usize), usize>,
    participants: &[Participant],
    num_sessions: usize,
) -> Vec<SessionAssignment> {
    let mut dense = vec![vec![0usize; participants.len()]; num_sessions];
    for (&(session, p_idx), &table) in schedule {
        dense[session][p_idx] = table;
    }
    decode(&dense, participants, &[])
}
