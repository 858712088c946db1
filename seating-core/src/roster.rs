//! Roster Normalizer: turns raw upload rows into a canonical, validated
//! participant list.
//!
//! Grounded on `dataframe_to_participant_dict.py`'s `_assign_couple_ids`
//! (sorted-pair canonical key, first-occurrence mints the id) plus the
//! validation `roster_service.py` performs at its own layer.

use crate::error::EngineError;
use crate::models::{Participant, RosterRow};
use std::collections::HashMap;

const MAX_NAME_LEN: usize = 100;
const FORBIDDEN_CHARS: &[char] = &['<', '>', '&', '"', '\'', '/', '\\', '{', '}', '[', ']'];

/// Strips surrounding whitespace, collapses internal whitespace runs to a
/// single space, drops characters that could be mistaken for markup, and
/// truncates to 100 characters.
pub fn sanitize_name(raw: &str) -> String {
    let collapsed = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let cleaned: String = collapsed
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c))
        .collect();
    cleaned.chars().take(MAX_NAME_LEN).collect()
}

/// Truthy facilitator strings, case-insensitive.
fn is_truthy(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "yes" | "y" | "true" | "1")
}

/// Validates and canonicalizes a raw roster into participants.
///
/// Partner names are sanitized the same way as `Name` before lookup. An
/// empty or absent partner leaves `couple_id` unset. Couple ids are minted
/// in row order: the first occurrence of a canonical `{name, partner}` pair
/// (names sorted) gets the next id; the partner's own row reuses it.
///
/// # Errors
///
/// Returns [`EngineError::InvalidRoster`] for a self-partnership, a partner
/// name that doesn't match any row in the roster, an asymmetric partnership
/// (A names B but B doesn't name A), or a name that sanitizes to empty.
pub fn normalize(rows: &[RosterRow]) -> Result<Vec<Participant>, EngineError> {
    let sanitized: Vec<(String, Option<String>)> = rows
        .iter()
        .map(|r| {
            let name = sanitize_name(&r.name);
            let partner = r
                .partner
                .as_deref()
                .map(sanitize_name)
                .filter(|p| !p.is_empty());
            (name, partner)
        })
        .collect();

    for (name, _) in &sanitized {
        if name.is_empty() {
            return Err(EngineError::InvalidRoster(
                "a roster row has an empty name after sanitization".to_string(),
            ));
        }
    }

    let name_to_partner: HashMap<&str, Option<&str>> = sanitized
        .iter()
        .map(|(name, partner)| (name.as_str(), partner.as_deref()))
        .collect();

    for (name, partner) in &sanitized {
        let Some(partner_name) = partner else {
            continue;
        };
        if partner_name == name {
            return Err(EngineError::InvalidRoster(format!(
                "{name} is listed as their own partner"
            )));
        }
        match name_to_partner.get(partner_name.as_str()) {
            None => {
                return Err(EngineError::InvalidRoster(format!(
                    "{name}'s partner \"{partner_name}\" is not in the roster"
                )));
            }
            Some(back_reference) => {
                if *back_reference != Some(name.as_str()) {
                    return Err(EngineError::InvalidRoster(format!(
                        "{name} and {partner_name} have an asymmetric partnership"
                    )));
                }
            }
        }
    }

    let mut couple_keys: HashMap<(String, String), u32> = HashMap::new();
    let mut next_couple_id: u32 = 1;
    let mut participants = Vec::with_capacity(rows.len());

    for (idx, row) in rows.iter().enumerate() {
        let (name, partner) = &sanitized[idx];
        let couple_id = partner.as_ref().map(|partner_name| {
            let mut pair = [name.clone(), partner_name.clone()];
            pair.sort();
            let key = (pair[0].clone(), pair[1].clone());
            *couple_keys.entry(key).or_insert_with(|| {
                let id = next_couple_id;
                next_couple_id += 1;
                id
            })
        });

        participants.push(Participant {
            id: (idx + 1) as u32,
            name: name.clone(),
            religion: sanitize_name(&row.religion),
            gender: sanitize_name(&row.gender),
            partner_name: partner.clone(),
            couple_id,
            is_facilitator: row.facilitator.as_deref().map(is_truthy).unwrap_or(false),
        });
    }

    Ok(participants)
}
