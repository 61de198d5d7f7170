//! Integrity checks for game-state snapshots.
//!
//! [`validate_integrity`] runs on typed state; [`sanitize`] is the recovery
//! path for snapshots that fail to decode cleanly.

use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::GameState;

/// Hp assigned to a snapshot whose hp is not a number.
pub const RESCUE_HP: u32 = 1;

const LEGACY_INVENTORY_KEY: &str = "artifactRetentionMatrix";
const COLLECTION_KEYS: [&str; 3] = ["inventory", "knownCharacters", "knownSpells"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityViolation {
    #[error("player hp {hp} outside 0..={max}")]
    HpOutOfBounds { hp: u32, max: u32 },
    #[error("player mana {mana} outside 0..={max}")]
    ManaOutOfBounds { mana: u32, max: u32 },
    #[error("duplicate inventory id {0}")]
    DuplicateItemId(String),
    #[error("duplicate character name {0}")]
    DuplicateCharacterName(String),
}

pub fn check_integrity(state: &GameState) -> Result<(), IntegrityViolation> {
    if state.player_hp > state.player_max_hp {
        return Err(IntegrityViolation::HpOutOfBounds {
            hp: state.player_hp,
            max: state.player_max_hp,
        });
    }
    let stats = &state.player_stats;
    if stats.mana > stats.max_mana {
        return Err(IntegrityViolation::ManaOutOfBounds {
            mana: stats.mana,
            max: stats.max_mana,
        });
    }

    let mut ids = HashSet::new();
    if let Some(item) = state.inventory.iter().find(|item| !ids.insert(item.id.as_str())) {
        return Err(IntegrityViolation::DuplicateItemId(item.id.clone()));
    }
    let mut names = HashSet::new();
    if let Some(character) = state
        .known_characters
        .iter()
        .find(|character| !names.insert(character.name.as_str()))
    {
        return Err(IntegrityViolation::DuplicateCharacterName(
            character.name.clone(),
        ));
    }
    Ok(())
}

pub fn validate_integrity(state: &GameState) -> bool {
    match check_integrity(state) {
        Ok(()) => true,
        Err(violation) => {
            debug!(target: "chronos_core.validator", %violation, "state failed integrity check");
            false
        }
    }
}

/// Best-effort repair of a raw snapshot.
///
/// Hp stored as `null` (how NaN serializes) becomes [`RESCUE_HP`]; missing
/// or negative hp becomes 0. Collections that are missing or not arrays become empty. Missing scalar
/// fields fall back to the initial state. Returns `None` when the repaired
/// snapshot still does not decode or still fails [`validate_integrity`].
pub fn sanitize(snapshot: Value) -> Option<GameState> {
    let Value::Object(mut fields) = snapshot else {
        warn!(target: "chronos_core.validator", "snapshot is not an object");
        return None;
    };

    rescue_hp(&mut fields);
    if let Some(legacy) = fields.remove(LEGACY_INVENTORY_KEY) {
        fields.entry("inventory").or_insert(legacy);
    }
    for key in COLLECTION_KEYS {
        let well_formed = fields.get(key).is_some_and(Value::is_array);
        if !well_formed {
            debug!(target: "chronos_core.validator", key, "replacing malformed collection");
            fields.insert(key.to_string(), Value::Array(Vec::new()));
        }
    }

    let state: GameState = match serde_json::from_value(Value::Object(fields)) {
        Ok(state) => state,
        Err(err) => {
            warn!(target: "chronos_core.validator", %err, "sanitized snapshot still does not decode");
            return None;
        }
    };
    validate_integrity(&state).then_some(state)
}

fn rescue_hp(fields: &mut Map<String, Value>) {
    let repaired = match fields.get("playerHp") {
        Some(Value::Null) => RESCUE_HP,
        Some(hp) => match hp.as_f64() {
            Some(hp) if hp.is_finite() => hp.max(0.0).floor() as u32,
            _ => 0,
        },
        None => 0,
    };
    fields.insert("playerHp".to_string(), Value::from(repaired));
}
