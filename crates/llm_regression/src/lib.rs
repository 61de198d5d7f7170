//! Fixtures for deterministic regression tests.
//!
//! Turns are scripted narrator payloads, replayed through the reconciler with
//! a fixed seed. Traces leave out generated ids so they stay readable in
//! snapshots.

use chronos_core::{prepare_turn, reconcile, GameState, PayloadError, SimulationRng, TurnResult};
use serde_json::{json, Value};

pub use chronos_core::DEFAULT_SEED;

/// One scripted turn: the player's action and the narrator's raw reply.
#[derive(Debug, Clone)]
pub struct ScriptedTurn {
    pub action: &'static str,
    pub payload: Value,
}

/// A three-turn fight: encounter, an exchange of blows, and the finish.
pub fn wraith_fight() -> Vec<ScriptedTurn> {
    vec![
        ScriptedTurn {
            action: "Enter the dark forest",
            payload: json!({
                "narrative": "A wraith drifts out of the fog.",
                "visualDescription": "a pale wraith between black trees",
                "suggestedActions": ["Cast Spark", "Flee"],
                "combatEncounter": {
                    "enemyName": "Wraith",
                    "enemyDescription": "A shade of cold hate",
                    "enemyHp": 15,
                    "weaknesses": ["holy"]
                }
            }),
        },
        ScriptedTurn {
            action: "Cast Spark",
            payload: json!({
                "narrative": "Lightning lances through the shade.",
                "visualDescription": "blue sparks in the fog",
                "suggestedActions": ["Swing the torch"],
                "statUpdates": { "hpChange": -4, "manaChange": -5 },
                "spellCooldownUpdates": [{ "spellName": "Spark", "cooldown": 2 }],
                "combatRound": {
                    "isCombatOver": false,
                    "logs": [
                        { "text": "Spark scorches the wraith", "type": "spell", "source": "player", "element": "lightning" },
                        { "text": "Spark deals 6", "type": "damage", "value": 6, "source": "player", "element": "lightning" },
                        { "text": "The wraith's touch chills you", "type": "damage", "value": 4, "source": "enemy" }
                    ],
                    "statusUpdates": {
                        "enemy": { "add": [{ "id": "shock", "name": "Shocked", "type": "debuff", "duration": 2, "icon": "bolt", "element": "lightning" }] }
                    }
                }
            }),
        },
        ScriptedTurn {
            action: "Swing the torch",
            payload: json!({
                "narrative": "The torch banishes the wraith.",
                "visualDescription": "embers settling on wet leaves",
                "suggestedActions": ["Search the clearing"],
                "questUpdate": "Find the source of the fog",
                "lootDropped": [{ "name": "Ectoplasm", "consumable": false, "itemType": "material", "rarity": "uncommon" }],
                "combatRound": {
                    "isCombatOver": true,
                    "logs": [
                        { "text": "The torch deals 12", "type": "damage", "value": 12, "source": "player", "element": "fire" }
                    ]
                }
            }),
        },
    ]
}

/// Replays `turns` from the initial state; returns the state after each turn.
pub fn replay(seed: u64, turns: &[ScriptedTurn]) -> Result<Vec<GameState>, PayloadError> {
    let mut rng = SimulationRng::new(seed);
    let mut state = GameState::initial();
    let mut states = Vec::with_capacity(turns.len());
    for turn in turns {
        let result = TurnResult::from_json(&turn.payload.to_string())?;
        let prepared = prepare_turn(&state, turn.action);
        state = reconcile(&state, prepared, &result, &mut rng).acknowledge_ui_triggers();
        states.push(state.clone());
    }
    Ok(states)
}

/// Id-free summary of a replay.
pub fn trace(seed: u64, states: &[GameState]) -> Value {
    let turns: Vec<Value> = states
        .iter()
        .map(|state| {
            json!({
                "turn": state.turn_count,
                "playerHp": state.player_hp,
                "mana": state.player_stats.mana,
                "inCombat": state.in_combat,
                "enemyHp": state.combat_enemy.as_ref().and_then(|enemy| enemy.hp),
                "enemyEffects": state
                    .combat_enemy
                    .as_ref()
                    .map(|enemy| enemy.active_effects.iter().map(|e| e.name.clone()).collect::<Vec<_>>())
                    .unwrap_or_default(),
                "log": state.combat_log.iter().map(|entry| entry.text.clone()).collect::<Vec<_>>(),
                "cooldowns": state.spell_cooldowns,
                "inventory": state.inventory.iter().map(|item| item.name.clone()).collect::<Vec<_>>(),
                "quest": state.current_quest,
                "tutorial": state.is_tutorial_active,
            })
        })
        .collect();
    json!({ "seed": seed, "turns": turns })
}

/// Damage rolls for the variance probe, handy for seed comparisons.
pub fn sample_damage_rolls(seed: u64, count: usize) -> Vec<u32> {
    let mut rng = SimulationRng::new(seed);
    let stats = chronos_core::PlayerStats::default();
    (0..count)
        .map(|_| chronos_core::formulas::calculate_damage(10, &stats, &[], &[], None, &mut rng))
        .collect()
}
