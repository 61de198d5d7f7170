//! Turn reconciliation: folds one narrator result into the previous state.
//!
//! A turn runs in three steps. [`prepare_turn`] does the synchronous pre-step
//! before the narrator is called, [`begin_turn`] raises the loading flags,
//! and then exactly one of [`reconcile`] (narrator succeeded) or
//! [`fail_turn`] (narrator failed) produces the state the player sees next.
//! `reconcile` never mutates its input; the enemy record in particular is
//! copied, modified and put back.

use rand::Rng;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::formulas::reduce_status_effect_durations;
use crate::model::{
    Character, CombatLogEntry, GameState, HistoryEntry, InventoryItem, LogKind, LogSource,
    PlayerStats, Role, StatusEffect, SPELL_HISTORY_LIMIT,
};
use crate::payload::{
    CharacterUpdates, CombatEncounter, EffectChanges, InventoryUpdates, ItemStub, StatUpdates,
    TurnResult,
};
use crate::rng::fresh_id;

pub const FAILURE_NARRATIVE: &str = "The threads of fate are tangled. (API Error).";
pub const COMBAT_FINISHED: &str = "Combat finished.";
pub const PLAYER_FALLEN: &str = "You have fallen...";

const CAST_PREFIX: &str = "cast ";

/// Everything worked out before the narrator is asked for a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTurn {
    pub action: String,
    pub spell_cast: Option<String>,
    /// Spell history including this turn's cast, capped at
    /// [`SPELL_HISTORY_LIMIT`].
    pub spell_history: Vec<String>,
    /// Cooldowns after this turn's decrement.
    pub spell_cooldowns: BTreeMap<String, u32>,
}

/// Returns the spell name from a `Cast <name>` action, prefix matched
/// case-insensitively.
pub fn detect_spell_cast(action: &str) -> Option<&str> {
    let prefix = action.get(..CAST_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(CAST_PREFIX) {
        return None;
    }
    let name = action[CAST_PREFIX.len()..].trim();
    (!name.is_empty()).then_some(name)
}

pub fn prepare_turn(state: &GameState, action: &str) -> PreparedTurn {
    let spell_cast = detect_spell_cast(action).map(str::to_string);

    let mut spell_history = state.spell_history.clone();
    if let Some(spell) = &spell_cast {
        spell_history.push(spell.clone());
        if spell_history.len() > SPELL_HISTORY_LIMIT {
            let excess = spell_history.len() - SPELL_HISTORY_LIMIT;
            spell_history.drain(..excess);
        }
    }

    let spell_cooldowns = state
        .spell_cooldowns
        .iter()
        .filter_map(|(spell, turns)| {
            let remaining = turns.saturating_sub(1);
            (remaining > 0).then(|| (spell.clone(), remaining))
        })
        .collect();

    PreparedTurn {
        action: action.to_string(),
        spell_cast,
        spell_history,
        spell_cooldowns,
    }
}

/// State shown while the narrator call is in flight.
pub fn begin_turn(state: &GameState, turn: &PreparedTurn) -> GameState {
    GameState {
        is_loading: true,
        last_spell_cast: turn
            .spell_cast
            .clone()
            .or_else(|| state.last_spell_cast.clone()),
        ..state.clone()
    }
}

/// A failed narrator call leaves the game untouched apart from the error
/// narrative and the loading flags.
pub fn fail_turn(state: &GameState) -> GameState {
    GameState {
        current_narrative: FAILURE_NARRATIVE.to_string(),
        is_loading: false,
        image_loading: false,
        ..state.clone()
    }
}

pub fn reconcile<R: Rng + ?Sized>(
    state: &GameState,
    turn: PreparedTurn,
    result: &TurnResult,
    rng: &mut R,
) -> GameState {
    let mut spell_cooldowns = turn.spell_cooldowns;
    for update in result.spell_cooldown_updates.iter().flatten() {
        if update.cooldown == 0 {
            spell_cooldowns.remove(&update.spell_name);
        } else {
            spell_cooldowns.insert(update.spell_name.clone(), update.cooldown);
        }
    }

    let inventory = merge_inventory(
        state.inventory.clone(),
        result.inventory_updates.as_ref(),
        result.loot_dropped.as_deref(),
        rng,
    );
    let known_characters = merge_characters(
        state.known_characters.clone(),
        result.character_updates.as_ref(),
        rng,
    );
    let known_spells = merge_spells(
        state.known_spells.clone(),
        result.new_spells.as_deref().unwrap_or_default(),
    );
    let (player_hp, player_stats) = apply_stat_updates(
        state.player_hp,
        state.player_max_hp,
        state.player_stats,
        result.stat_updates.as_ref(),
    );

    let combat = resolve_combat(state, result, player_hp, rng);

    let mut history = state.history.clone();
    history.push(HistoryEntry {
        role: Role::User,
        text: turn.action,
    });
    history.push(HistoryEntry {
        role: Role::Model,
        text: result.narrative.clone(),
    });

    let next = GameState {
        current_narrative: result.narrative.clone(),
        history,
        inventory,
        known_characters,
        current_quest: non_blank(result.quest_update.as_ref())
            .unwrap_or_else(|| state.current_quest.clone()),
        player_visual_description: non_blank(result.player_appearance_update.as_ref())
            .or_else(|| state.player_visual_description.clone()),
        possible_actions: result.suggested_actions.clone(),
        is_loading: false,
        turn_count: state.turn_count.saturating_add(1),
        player_hp,
        player_stats,
        known_spells,
        spell_cooldowns,
        player_active_effects: combat.player_effects,
        spell_history: turn.spell_history,
        in_combat: combat.in_combat,
        combat_enemy: combat.enemy,
        combat_log: combat.log,
        is_tutorial_active: combat.trigger_tutorial || state.is_tutorial_active,
        screen_shake: combat.screen_shake,
        ..state.clone()
    };

    info!(
        target: "chronos_core.reconcile",
        turn = next.turn_count,
        hp = next.player_hp,
        mana = next.player_stats.mana,
        in_combat = next.in_combat,
        "turn reconciled"
    );
    next
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.filter(|text| !text.is_empty()).cloned()
}

fn item_from_stub<R: Rng + ?Sized>(stub: &ItemStub, rng: &mut R) -> InventoryItem {
    InventoryItem {
        id: fresh_id(rng),
        name: stub.name.clone(),
        description: stub.description.clone(),
        consumable: stub.consumable,
        effects: stub.effects.clone(),
        icon: stub.icon.clone(),
        max_durability: stub.max_durability,
        current_durability: stub.current_durability.or(stub.max_durability),
        rarity: stub.rarity,
        item_type: stub.item_type,
    }
}

fn merge_inventory<R: Rng + ?Sized>(
    mut inventory: Vec<InventoryItem>,
    updates: Option<&InventoryUpdates>,
    loot: Option<&[ItemStub]>,
    rng: &mut R,
) -> Vec<InventoryItem> {
    let added = updates.map(|u| u.add.as_slice()).unwrap_or_default();
    for stub in added.iter().chain(loot.unwrap_or_default()) {
        inventory.push(item_from_stub(stub, rng));
    }

    let Some(updates) = updates else {
        return inventory;
    };

    for update in &updates.update {
        match inventory.iter_mut().find(|item| item.name == update.name) {
            Some(item) => {
                let durability = match item.max_durability {
                    Some(max) => update.new_durability.min(max),
                    None => update.new_durability,
                };
                item.current_durability = Some(durability);
            }
            None => debug!(
                target: "chronos_core.reconcile",
                item = %update.name,
                "durability update for unknown item skipped"
            ),
        }
    }

    if !updates.remove.is_empty() {
        inventory.retain(|item| !updates.remove.contains(&item.name));
    }
    inventory
}

fn merge_characters<R: Rng + ?Sized>(
    mut characters: Vec<Character>,
    updates: Option<&CharacterUpdates>,
    rng: &mut R,
) -> Vec<Character> {
    let Some(updates) = updates else {
        return characters;
    };

    for stub in &updates.add {
        match characters.iter_mut().find(|c| c.name == stub.name) {
            Some(existing) => {
                existing.role = stub.role.clone();
                existing.description = stub.description.clone();
                if let Some(hp) = stub.hp {
                    existing.hp = Some(hp);
                }
                if let Some(resistances) = &stub.resistances {
                    existing.resistances = resistances.clone();
                }
                if let Some(weaknesses) = &stub.weaknesses {
                    existing.weaknesses = weaknesses.clone();
                }
            }
            None => characters.push(Character {
                id: fresh_id(rng),
                name: stub.name.clone(),
                role: stub.role.clone(),
                description: stub.description.clone(),
                hp: stub.hp,
                max_hp: None,
                active_effects: Vec::new(),
                resistances: stub.resistances.clone().unwrap_or_default(),
                weaknesses: stub.weaknesses.clone().unwrap_or_default(),
            }),
        }
    }

    if !updates.remove.is_empty() {
        characters.retain(|c| !updates.remove.contains(&c.name));
    }
    characters
}

fn merge_spells(mut known: Vec<String>, learned: &[String]) -> Vec<String> {
    for spell in learned {
        if !known.contains(spell) {
            known.push(spell.clone());
        }
    }
    known
}

fn apply_stat_updates(
    hp: u32,
    max_hp: u32,
    mut stats: PlayerStats,
    updates: Option<&StatUpdates>,
) -> (u32, PlayerStats) {
    let hp_change = updates.and_then(|u| u.hp_change).unwrap_or(0);
    let mana_change = updates.and_then(|u| u.mana_change).unwrap_or(0);
    stats.mana = clamp_delta(stats.mana, mana_change, stats.max_mana);
    (clamp_delta(hp, hp_change, max_hp), stats)
}

fn clamp_delta(current: u32, delta: i32, max: u32) -> u32 {
    let next = i64::from(current) + i64::from(delta);
    next.clamp(0, i64::from(max)) as u32
}

struct CombatResolution {
    in_combat: bool,
    enemy: Option<Character>,
    log: Vec<CombatLogEntry>,
    player_effects: Vec<StatusEffect>,
    screen_shake: bool,
    trigger_tutorial: bool,
}

fn resolve_combat<R: Rng + ?Sized>(
    state: &GameState,
    result: &TurnResult,
    player_hp: u32,
    rng: &mut R,
) -> CombatResolution {
    let round = result.combat_round.as_ref();
    let round_logs = round.and_then(|r| r.logs.as_deref());

    // Outside combat the round's logs start a fresh snapshot.
    let mut log = if state.in_combat {
        state.combat_log.clone()
    } else {
        Vec::new()
    };
    log.extend(round_logs.unwrap_or_default().iter().cloned());

    let mut resolution = CombatResolution {
        in_combat: state.in_combat,
        enemy: state.combat_enemy.clone(),
        log,
        player_effects: state.player_active_effects.clone(),
        screen_shake: false,
        trigger_tutorial: false,
    };

    if let Some(encounter) = &result.combat_encounter {
        start_encounter(&mut resolution, encounter, rng);
        resolution.trigger_tutorial = !state.combat_tutorial_seen;
    }

    if let Some(round) = round {
        for entry in round_logs.unwrap_or_default() {
            apply_round_entry(&mut resolution, entry);
        }

        if let Some(updates) = &round.status_updates {
            if let Some(changes) = &updates.player {
                resolution.player_effects =
                    apply_effect_changes(std::mem::take(&mut resolution.player_effects), changes);
            }
            if let Some(changes) = &updates.enemy {
                resolution.enemy = resolution.enemy.take().map(|enemy| Character {
                    active_effects: apply_effect_changes(enemy.active_effects.clone(), changes),
                    ..enemy
                });
            }
        }

        if round.is_combat_over {
            resolution.in_combat = false;
            resolution.enemy = None;
            resolution.log.push(CombatLogEntry::system(COMBAT_FINISHED));
            info!(target: "chronos_core.reconcile", "combat finished");
        }
    }

    if player_hp == 0 {
        resolution.in_combat = false;
        resolution.log.push(CombatLogEntry::system(PLAYER_FALLEN));
        resolution.screen_shake = true;
        info!(target: "chronos_core.reconcile", "player has fallen");
    }

    resolution
}

fn start_encounter<R: Rng + ?Sized>(
    resolution: &mut CombatResolution,
    encounter: &CombatEncounter,
    rng: &mut R,
) {
    resolution.in_combat = true;
    resolution.enemy = Some(Character {
        id: fresh_id(rng),
        name: encounter.enemy_name.clone(),
        role: "Enemy".to_string(),
        description: encounter.enemy_description.clone(),
        hp: Some(encounter.enemy_hp),
        max_hp: Some(encounter.enemy_hp),
        active_effects: Vec::new(),
        resistances: encounter.resistances.clone(),
        weaknesses: encounter.weaknesses.clone(),
    });
    resolution.log.push(CombatLogEntry::system(format!(
        "Encounter started: {}",
        encounter.enemy_name
    )));
    info!(
        target: "chronos_core.reconcile",
        enemy = %encounter.enemy_name,
        hp = encounter.enemy_hp,
        "encounter started"
    );
}

/// Player damage comes off the enemy's hp, floored at zero. Any damage entry
/// from the enemy or the world shakes the screen.
fn apply_round_entry(resolution: &mut CombatResolution, entry: &CombatLogEntry) {
    if entry.kind != LogKind::Damage {
        return;
    }
    match (entry.source, entry.value) {
        (LogSource::Player, Some(value)) => {
            if let Some(enemy) = resolution.enemy.take() {
                let hp = enemy.hp.unwrap_or(0).saturating_sub(value);
                resolution.enemy = Some(Character {
                    hp: Some(hp),
                    ..enemy
                });
                resolution.screen_shake = true;
            }
        }
        (LogSource::Player, None) => {}
        (LogSource::Enemy | LogSource::System, _) => resolution.screen_shake = true,
    }
}

/// New effects are added unless one with the same name exists. A present
/// removal list also ages the survivors by one turn.
fn apply_effect_changes(mut effects: Vec<StatusEffect>, changes: &EffectChanges) -> Vec<StatusEffect> {
    for effect in changes.add.iter().flatten() {
        if !effects.iter().any(|e| e.name == effect.name) {
            effects.push(effect.clone());
        }
    }
    if let Some(remove) = &changes.remove {
        effects.retain(|e| !remove.contains(&e.name));
        effects = reduce_status_effect_durations(effects);
    }
    effects
}
