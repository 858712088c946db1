//! End-to-end scenarios from the engine's testable-properties section,
//! exercised through the public `generate`/`regenerate_session` API.

use seating_core::models::{
    GenerateOptions, IncrementalChoice, ParticipantView, RegenerateOptions, RosterRow,
    SessionAssignment, SolutionQuality,
};
use std::collections::BTreeMap;

fn row(name: &str, religion: &str, gender: &str, partner: Option<&str>) -> RosterRow {
    RosterRow {
        name: name.to_string(),
        religion: religion.to_string(),
        gender: gender.to_string(),
        partner: partner.map(str::to_string),
        facilitator: None,
    }
}

/// For each religion value present, the per-table headcount of that value
/// (zero for tables with none), so the caller can check spread across
/// tables rather than within one.
fn religion_counts_by_value(
    tables: &std::collections::BTreeMap<u32, Vec<seating_core::models::ParticipantView>>,
) -> std::collections::HashMap<String, Vec<usize>> {
    let per_table: Vec<std::collections::HashMap<String, usize>> = tables
        .values()
        .map(|members| {
            let mut counts = std::collections::HashMap::new();
            for m in members {
                *counts.entry(m.religion.clone()).or_insert(0usize) += 1;
            }
            counts
        })
        .collect();
    let all_religions: std::collections::HashSet<String> =
        per_table.iter().flat_map(|t| t.keys().cloned()).collect();
    all_religions
        .into_iter()
        .map(|religion| {
            let counts = per_table
                .iter()
                .map(|t| *t.get(&religion).unwrap_or(&0))
                .collect();
            (religion, counts)
        })
        .collect()
}

/// Scenario 1: four participants, two couples, two tables, one session.
#[test]
fn four_participants_two_couples_splits_tables() {
    let rows = vec![
        row("John", "Christian", "Male", Some("Jane")),
        row("Jane", "Christian", "Female", Some("John")),
        row("Bob", "Jewish", "Male", Some("Alice")),
        row("Alice", "Jewish", "Female", Some("Bob")),
    ];
    let output = seating_core::generate(&rows, 2, 1, &GenerateOptions::default()).unwrap();
    assert_eq!(output.assignments.len(), 1);
    let tables = &output.assignments[0].tables;
    assert_eq!(tables.len(), 2);
    for members in tables.values() {
        assert_eq!(members.len(), 2);
        let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        assert!(!(names.contains(&"John") && names.contains(&"Jane")));
        assert!(!(names.contains(&"Bob") && names.contains(&"Alice")));
    }
}

/// Scenario 2: ten participants, four tables, six sessions -> auto-incremental.
#[test]
fn ten_participants_six_sessions_satisfies_every_session_invariant() {
    let religions = ["Christian", "Jewish", "Muslim", "Other"];
    let mut rows = Vec::new();
    for i in 0..10 {
        let religion = religions[i % religions.len()];
        let gender = if i % 2 == 0 { "Male" } else { "Female" };
        rows.push(row(&format!("P{i}"), religion, gender, None));
    }
    // Two couples among the ten.
    rows[0].partner = Some("P1".to_string());
    rows[1].partner = Some("P0".to_string());
    rows[2].partner = Some("P3".to_string());
    rows[3].partner = Some("P2".to_string());

    let mut options = GenerateOptions::default();
    options.max_time_seconds = 60;
    let output = seating_core::generate(&rows, 4, 6, &options).unwrap();
    assert_eq!(output.assignments.len(), 6);
    assert_eq!(output.report.quality, SolutionQuality::Incremental);
    for session in &output.assignments {
        let sizes: Vec<usize> = session.tables.values().map(|v| v.len()).collect();
        assert!(sizes.iter().max().unwrap() - sizes.iter().min().unwrap() <= 1);
        for counts in religion_counts_by_value(&session.tables).values() {
            assert!(counts.iter().max().unwrap() - counts.iter().min().unwrap() <= 1);
        }
    }
}

/// Scenario 3: one Muslim among five Christians, six participants, three tables.
#[test]
fn religion_skew_never_pools_the_majority_at_one_table() {
    let rows = vec![
        row("A", "Muslim", "Female", None),
        row("B", "Christian", "Male", None),
        row("C", "Christian", "Female", None),
        row("D", "Christian", "Male", None),
        row("E", "Christian", "Female", None),
        row("F", "Christian", "Male", None),
    ];
    let output = seating_core::generate(&rows, 3, 1, &GenerateOptions::default()).unwrap();
    let tables = &output.assignments[0].tables;
    for members in tables.values() {
        let christians = members.iter().filter(|m| m.religion == "Christian").count();
        assert!(christians < 5);
    }
}

/// Scenario 4: regenerating a session with absences produces a changed
/// session containing exactly the active roster.
#[test]
fn regeneration_with_absences_uses_only_active_participants() {
    let rows = vec![
        row("A", "Christian", "Male", None),
        row("B", "Christian", "Female", None),
        row("C", "Jewish", "Male", None),
        row("D", "Jewish", "Female", None),
    ];
    let initial = seating_core::generate(&rows, 2, 1, &GenerateOptions::default()).unwrap();
    let absent = vec!["A".to_string()];
    let output = seating_core::regenerate_session(
        &initial.assignments,
        &rows,
        1,
        &absent,
        2,
        &RegenerateOptions::default(),
    )
    .unwrap();
    let seated: Vec<&str> = output.assignments[0]
        .tables
        .values()
        .flatten()
        .map(|m| m.name.as_str())
        .collect();
    assert!(!seated.contains(&"A"));
    assert_eq!(seated.len(), 3);
    assert_eq!(output.assignments[0].absent.len(), 1);
}

/// Scenario 5: a tiny 2-person, 2-table couple whose current seating already
/// has them sharing a table. Hard-different forbids that shared table for
/// both of them, and with only one table left, that forces them right back
/// together — a genuine forced collision the hard attempt cannot escape.
/// Soft-variety then has no hard constraint to fight and splits them.
#[test]
fn forced_collision_regeneration_recovers_via_soft_fallback() {
    let rows = vec![
        row("John", "Christian", "Male", Some("Jane")),
        row("Jane", "Christian", "Female", Some("John")),
    ];
    let mut tables = BTreeMap::new();
    tables.insert(
        1,
        vec![
            ParticipantView {
                name: "John".to_string(),
                religion: "Christian".to_string(),
                gender: "Male".to_string(),
                partner: Some("Jane".to_string()),
            },
            ParticipantView {
                name: "Jane".to_string(),
                religion: "Christian".to_string(),
                gender: "Female".to_string(),
                partner: Some("John".to_string()),
            },
        ],
    );
    tables.insert(2, vec![]);
    let existing = vec![SessionAssignment {
        session: 1,
        tables,
        absent: vec![],
    }];
    let mut options = RegenerateOptions::default();
    options.max_time_seconds = 30;
    let output = seating_core::regenerate_session(&existing, &rows, 1, &[], 2, &options)
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

/// A single table cannot separate a couple under any arrangement; both hard
/// and soft attempts fail, unlike the two-table forced-collision case above.
#[test]
fn single_table_regeneration_reports_failure_after_soft_fallback() {
    let rows = vec![
        row("John", "Christian", "Male", Some("Jane")),
        row("Jane", "Christian", "Female", Some("John")),
    ];
    let initial = seating_core::generate(&rows, 2, 1, &GenerateOptions::default()).unwrap();
    let mut options = RegenerateOptions::default();
    options.max_time_seconds = 30;
    let result = seating_core::regenerate_session(&initial.assignments, &rows, 1, &[], 1, &options);
    assert!(result.is_err());
}

/// Scenario 6: S=6 with use_incremental=auto takes the incremental path.
#[test]
fn auto_incremental_triggers_at_six_sessions() {
    let rows = vec![
        row("A", "Christian", "Male", None),
        row("B", "Christian", "Female", None),
        row("C", "Jewish", "Male", None),
        row("D", "Jewish", "Female", None),
    ];
    let mut options = GenerateOptions::default();
    options.use_incremental = IncrementalChoice::Auto;
    options.max_time_seconds = 60;
    let output = seating_core::generate(&rows, 2, 6, &options).unwrap();
    assert_eq!(output.assignments.len(), 6);
    assert_eq!(output.report.quality, SolutionQuality::Incremental);
}
