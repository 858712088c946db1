//! Solver state: a dense `schedule[session][participant] = table` array plus
//! the precomputed structures that make move evaluation and application fast.
//!
//! Exactly-one-table-per-session is structural (the schedule type can't
//! represent anything else). Locked positions and hard forbidden-same-table
//! are enforced by excluding them from the candidate move set entirely —
//! [`State::movable_cells`] and [`State::legal_targets`] never offer a move
//! that would violate either, so the search can never produce one. Table
//! balance, attribute spread, and couple separation are tracked as
//! [`Violation`]s and driven to zero by the search; they are not structurally
//! guaranteed, so [`State::violations`] is the source of truth for whether a
//! schedule is actually feasible.

use crate::error::EngineError;
use crate::models::ProblemInstance;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

/// Dominant weight applied to [`Violation`] counts so that any feasible
/// schedule strictly outscores any infeasible one, regardless of how good
/// the infeasible one's soft objective looks.
const VIOLATION_WEIGHT: f64 = 1_000_000.0;
const NEAR_WINDOW_WEIGHT: f64 = 1.0;
const HISTORICAL_WEIGHT: f64 = 1.0;
const VARIETY_WEIGHT: f64 = 1.0;

/// Count of hard-constraint units still broken in the current schedule.
/// Zero iff the schedule is a genuinely feasible assignment.
pub type Violation = u64;

#[derive(Debug, Clone)]
pub struct State {
    num_tables: usize,
    num_sessions: usize,
    num_participants: usize,

    /// `schedule[session][participant_idx] = table_idx`.
    schedule: Vec<Vec<usize>>,

    /// `(participant_idx, session) -> table_idx`, excluded from the move set.
    locked: HashMap<(usize, usize), usize>,
    /// Canonical `(idx, idx)` pairs, `a < b`, already seated together.
    historical_pairings: std::collections::HashSet<(usize, usize)>,
    /// `participant_idx -> table_idx` for session 0, regeneration only.
    current_table_map: HashMap<usize, usize>,
    require_different: bool,
    pairing_window: usize,

    partner_idx: Vec<Option<usize>>,
    religion_val: Vec<usize>,
    gender_val: Vec<usize>,
    num_religion_vals: usize,
    num_gender_vals: usize,

    /// `table_counts[session][table]`, maintained incrementally.
    table_counts: Vec<Vec<usize>>,
    /// `religion_counts[session][religion_val][table]`.
    religion_counts: Vec<Vec<Vec<usize>>>,
    /// `gender_counts[session][gender_val][table]`.
    gender_counts: Vec<Vec<Vec<usize>>>,

    /// Moves evaluated so far (telemetry: CP-SAT's "branches").
    pub moves_evaluated: u64,
    /// Moves rejected by a legality gate before cost evaluation (CP-SAT's
    /// "conflicts").
    pub moves_rejected: u64,
}

fn intern(values: &mut Vec<String>, value: &str) -> usize {
    match values.iter().position(|v| v == value) {
        Some(idx) => idx,
        None => {
            values.push(value.to_string());
            values.len() - 1
        }
    }
}

impl State {
    /// Builds initial state from a resolved problem instance: precomputes
    /// attribute indices and couple links, then constructs a legal starting
    /// schedule (random subject to locks and forbidden positions).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InsufficientParticipants`] if there are fewer
    /// participants than tables.
    pub fn new(problem: &ProblemInstance, rng: &mut impl Rng) -> Result<Self, EngineError> {
        let num_participants = problem.participants.len();
        if num_participants < problem.num_tables {
            return Err(EngineError::InsufficientParticipants {
                needed: problem.num_tables,
                available: num_participants,
            });
        }

        let mut religion_names = Vec::new();
        let mut gender_names = Vec::new();
        let religion_val: Vec<usize> = problem
            .participants
            .iter()
            .map(|p| intern(&mut religion_names, &p.religion))
            .collect();
        let gender_val: Vec<usize> = problem
            .participants
            .iter()
            .map(|p| intern(&mut gender_names, &p.gender))
            .collect();

        let id_to_idx: HashMap<u32, usize> = problem
            .participants
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.id, idx))
            .collect();
        let partner_idx: Vec<Option<usize>> = problem
            .participants
            .iter()
            .map(|p| {
                p.couple_id.and_then(|_| {
                    p.partner_name
                        .as_ref()
                        .and_then(|name| {
                            problem
                                .participants
                                .iter()
                                .find(|q| &q.name == name)
                                .and_then(|q| id_to_idx.get(&q.id).copied())
                        })
                })
            })
            .collect();

        let locked: HashMap<(usize, usize), usize> = problem.locked.clone();
        let historical_pairings: std::collections::HashSet<(usize, usize)> = problem
            .historical_pairings
            .iter()
            .filter_map(|&(a, b)| {
                let ia = id_to_idx.get(&a).copied()?;
                let ib = id_to_idx.get(&b).copied()?;
                Some(if ia < ib { (ia, ib) } else { (ib, ia) })
            })
            .collect();

        let num_tables = problem.num_tables;
        let num_sessions = problem.num_sessions;
        let num_religion_vals = religion_names.len().max(1);
        let num_gender_vals = gender_names.len().max(1);

        let mut state = State {
            num_tables,
            num_sessions,
            num_participants,
            schedule: vec![vec![0; num_participants]; num_sessions],
            locked,
            historical_pairings,
            current_table_map: problem.current_table_map.clone(),
            require_different: problem.require_different,
            pairing_window: problem.pairing_window,
            partner_idx,
            religion_val,
            gender_val,
            num_religion_vals,
            num_gender_vals,
            table_counts: vec![vec![0; num_tables]; num_sessions],
            religion_counts: vec![vec![vec![0; num_tables]; num_religion_vals]; num_sessions],
            gender_counts: vec![vec![vec![0; num_tables]; num_gender_vals]; num_sessions],
            moves_evaluated: 0,
            moves_rejected: 0,
        };

        state.build_initial_schedule(rng)?;
        Ok(state)
    }

    fn build_initial_schedule(&mut self, rng: &mut impl Rng) -> Result<(), EngineError> {
        let mut order: Vec<usize> = (0..self.num_participants).collect();
        for session in 0..self.num_sessions {
            order.shuffle(rng);
            for &p in &order {
                let table = if let Some(&t) = self.locked.get(&(p, session)) {
                    t
                } else {
                    let mut candidates: Vec<usize> = (0..self.num_tables).collect();
                    if self.require_different && session == 0 {
                        if let Some(&forbidden) = self.current_table_map.get(&p) {
                            candidates.retain(|&t| t != forbidden);
                        }
                    }
                    if candidates.is_empty() {
                        return Err(EngineError::InfeasibleModel(
                            "no legal table remains for a participant under the hard \
                             forbidden-same-table constraint"
                                .to_string(),
                        ));
                    }
                    // Round-robin over legal candidates as a starting point;
                    // search.rs improves balance, spread and separation from here.
                    candidates[p % candidates.len()]
                };
                self.place(session, p, table);
            }
        }
        // Symmetry breaking: pin participants[0] to table 0 of session 0, a
        // performance aid only, never a correctness requirement here.
        if self.num_sessions > 0
            && self.num_tables > 0
            && self.num_participants > 0
            && !self.locked.contains_key(&(0, 0))
            && !(self.require_different && self.current_table_map.get(&0) == Some(&0))
        {
            self.place(0, 0, 0);
        }
        Ok(())
    }

    fn place(&mut self, session: usize, p: usize, table: usize) {
        self.schedule[session][p] = table;
        self.table_counts[session][table] += 1;
        self.religion_counts[session][self.religion_val[p]][table] += 1;
        self.gender_counts[session][self.gender_val[p]][table] += 1;
    }

    /// Cells the search is allowed to move: every `(session, participant)`
    /// not pinned by a locked position.
    pub fn movable_cells(&self) -> Vec<(usize, usize)> {
        let mut cells = Vec::with_capacity(self.num_sessions * self.num_participants);
        for session in 0..self.num_sessions {
            for p in 0..self.num_participants {
                if !self.locked.contains_key(&(p, session)) {
                    cells.push((session, p));
                }
            }
        }
        cells
    }

    /// Tables `p` may legally occupy in `session`, honoring hard
    /// forbidden-same-table when `require_different` applies to this session.
    pub fn legal_targets(&self, session: usize, p: usize) -> Vec<usize> {
        let mut targets: Vec<usize> = (0..self.num_tables).collect();
        if self.require_different && session == 0 {
            if let Some(&forbidden) = self.current_table_map.get(&p) {
                targets.retain(|&t| t != forbidden);
            }
        }
        targets
    }

    pub fn num_sessions(&self) -> usize {
        self.num_sessions
    }

    pub fn num_tables(&self) -> usize {
        self.num_tables
    }

    pub fn table_of(&self, session: usize, p: usize) -> usize {
        self.schedule[session][p]
    }

    /// Number of hard-constraint units still violated: table-balance excess,
    /// attribute-spread excess, and couples still sharing a table. Zero iff
    /// the schedule is feasible.
    pub fn violations(&self) -> Violation {
        let mut total: Violation = 0;
        for session in 0..self.num_sessions {
            total += spread_excess(&self.table_counts[session]);
            for religion in 0..self.num_religion_vals {
                total += spread_excess(&self.religion_counts[session][religion]);
            }
            for gender in 0..self.num_gender_vals {
                total += spread_excess(&self.gender_counts[session][gender]);
            }
        }
        for p in 0..self.num_participants {
            if let Some(partner) = self.partner_idx[p] {
                if partner > p {
                    for session in 0..self.num_sessions {
                        if self.schedule[session][p] == self.schedule[session][partner] {
                            total += 1;
                        }
                    }
                }
            }
        }
        total
    }

    /// Dominant-weighted violations plus the soft objective (near-window
    /// repeats, historical repeats, same-table variety). Lower is better.
    pub fn cost(&self) -> f64 {
        VIOLATION_WEIGHT * self.violations() as f64 + self.soft_objective()
    }

    /// Near-window repeats, historical repeats, and same-table variety,
    /// summed exactly once per qualifying occurrence. The near-window term
    /// is computed over unordered session *pairs* `{s1, s2}` with
    /// `s2 - s1 <= pairing_window`, adding one penalty unit per participant
    /// pair that meets at both — not once per session either session
    /// visits, which would double-count every qualifying pair.
    fn soft_objective(&self) -> f64 {
        let mut penalty = 0.0;
        for s1 in 0..self.num_sessions {
            for s2 in (s1 + 1)..self.num_sessions {
                if s2 - s1 > self.pairing_window {
                    break;
                }
                for a in 0..self.num_participants {
                    for b in (a + 1)..self.num_participants {
                        if self.schedule[s1][a] == self.schedule[s1][b]
                            && self.schedule[s2][a] == self.schedule[s2][b]
                        {
                            penalty += NEAR_WINDOW_WEIGHT;
                        }
                    }
                }
            }
        }
        for session in 0..self.num_sessions {
            for a in 0..self.num_participants {
                for b in (a + 1)..self.num_participants {
                    if self.schedule[session][a] != self.schedule[session][b] {
                        continue;
                    }
                    let key = if a < b { (a, b) } else { (b, a) };
                    if self.historical_pairings.contains(&key) {
                        penalty += HISTORICAL_WEIGHT;
                    }
                }
            }
            if session == 0 && !self.require_different {
                for (&p, &table) in &self.current_table_map {
                    if self.schedule[0][p] == table {
                        penalty += VARIETY_WEIGHT;
                    }
                }
            }
        }
        penalty
    }

    /// Count of sessions other than `session`, within `pairing_window`, in
    /// which `a` and `b` also meet.
    fn meets_within_window(&self, a: usize, b: usize, session: usize) -> usize {
        (0..self.num_sessions)
            .filter(|&other| {
                other != session
                    && other.abs_diff(session) <= self.pairing_window
                    && self.schedule[other][a] == self.schedule[other][b]
            })
            .count()
    }

    /// Cost delta of moving `p` from its current table to `new_table` in
    /// `session`, without mutating state.
    ///
    /// Computed incrementally rather than by re-running [`State::cost`]:
    /// the violation delta only touches the three count rows (table,
    /// religion, gender) for `session` plus the partner's current table,
    /// and the soft delta only touches participants seated with `p` at
    /// `old_table` or `new_table` in `session` — every other session and
    /// every other table is provably unaffected by a single-cell move.
    ///
    /// # Arguments
    ///
    /// * `session` - session index the move happens in.
    /// * `p` - participant index being moved.
    /// * `new_table` - destination table index.
    ///
    /// # Returns
    ///
    /// The signed change in [`State::cost`] if the move were applied:
    /// negative means the move improves the schedule. Returns `0.0` if
    /// `new_table` is already `p`'s table, and `f64::INFINITY` if the move
    /// is illegal (`p` locked at `session`, or forbidden by
    /// `require_different`) — this should never be offered by
    /// [`State::legal_targets`], but is checked again here as a
    /// last-resort gate, incrementing `moves_rejected` when it fires.
    pub fn evaluate_move(&mut self, session: usize, p: usize, new_table: usize) -> f64 {
        self.moves_evaluated += 1;
        let old_table = self.schedule[session][p];
        if old_table == new_table {
            return 0.0;
        }
        if self.locked.contains_key(&(p, session)) {
            self.moves_rejected += 1;
            return f64::INFINITY;
        }
        if self.require_different
            && session == 0
            && self.current_table_map.get(&p) == Some(&new_table)
        {
            self.moves_rejected += 1;
            return f64::INFINITY;
        }

        let mut violation_delta: i64 = 0;
        violation_delta += table_move_delta(&self.table_counts[session], old_table, new_table);
        let rv = self.religion_val[p];
        violation_delta += table_move_delta(&self.religion_counts[session][rv], old_table, new_table);
        let gv = self.gender_val[p];
        violation_delta += table_move_delta(&self.gender_counts[session][gv], old_table, new_table);

        if let Some(partner) = self.partner_idx[p] {
            let partner_table = self.schedule[session][partner];
            if partner_table == old_table {
                violation_delta -= 1;
            }
            if partner_table == new_table {
                violation_delta += 1;
            }
        }

        let mut soft_delta = 0.0;
        for other in 0..self.num_participants {
            if other == p {
                continue;
            }
            let other_table = self.schedule[session][other];
            let was_meeting = other_table == old_table;
            let will_meet = other_table == new_table;
            if was_meeting == will_meet {
                continue;
            }
            let key = if p < other { (p, other) } else { (other, p) };
            let historical = self.historical_pairings.contains(&key);
            let window_hits = self.meets_within_window(p, other, session) as f64;
            if was_meeting {
                soft_delta -= NEAR_WINDOW_WEIGHT * window_hits;
                if historical {
                    soft_delta -= HISTORICAL_WEIGHT;
                }
            }
            if will_meet {
                soft_delta += NEAR_WINDOW_WEIGHT * window_hits;
                if historical {
                    soft_delta += HISTORICAL_WEIGHT;
                }
            }
        }

        if session == 0 && !self.require_different {
            if let Some(&current) = self.current_table_map.get(&p) {
                if old_table == current {
                    soft_delta -= VARIETY_WEIGHT;
                }
                if new_table == current {
                    soft_delta += VARIETY_WEIGHT;
                }
            }
        }

        VIOLATION_WEIGHT * violation_delta as f64 + soft_delta
    }

    /// Applies a previously-evaluated move, updating the schedule and every
    /// incremental count in lockstep.
    ///
    /// # Arguments
    ///
    /// * `session` - session index the move happens in.
    /// * `p` - participant index being moved.
    /// * `new_table` - destination table index.
    ///
    /// # Returns
    ///
    /// Nothing; mutates `self` in place. A no-op when `new_table` is
    /// already `p`'s current table.
    ///
    /// Callers should only pass moves already scored by
    /// [`State::evaluate_move`] — this method does not re-check legality
    /// (locks, `require_different`), it trusts the caller to have gated
    /// that already, matching how the local search always pairs one
    /// `evaluate_move` call with the `apply_move` it accepts.
    pub fn apply_move(&mut self, session: usize, p: usize, new_table: usize) {
        let old_table = self.schedule[session][p];
        if old_table == new_table {
            return;
        }
        self.schedule[session][p] = new_table;
        self.table_counts[session][old_table] -= 1;
        self.table_counts[session][new_table] += 1;
        let rv = self.religion_val[p];
        self.religion_counts[session][rv][old_table] -= 1;
        self.religion_counts[session][rv][new_table] += 1;
        let gv = self.gender_val[p];
        self.gender_counts[session][gv][old_table] -= 1;
        self.gender_counts[session][gv][new_table] += 1;
    }

    /// Flattened `schedule[session][participant_idx]` for the decoder.
    pub fn schedule(&self) -> &[Vec<usize>] {
        &self.schedule
    }
}

/// `max - min` over table counts, floored at zero excess beyond the allowed
/// slack of 1 (the balance/spread invariant is `max - min <= 1`).
fn spread_excess(counts: &[usize]) -> Violation {
    let Some(&max) = counts.iter().max() else {
        return 0;
    };
    let Some(&min) = counts.iter().min() else {
        return 0;
    };
    (max - min).saturating_sub(1) as Violation
}

/// Signed change in total spread-excess (table-balance-shaped) violations
/// from moving one member out of `from` and into `to`.
fn table_move_delta(counts: &[usize], from: usize, to: usize) -> i64 {
    let before = spread_excess(counts) as i64;
    let mut after_counts = counts.to_vec();
    after_counts[from] -= 1;
    after_counts[to] += 1;
    let after = spread_excess(&after_counts) as i64;
    after - before
}
