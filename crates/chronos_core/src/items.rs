//! Using an item from the inventory.

use rand::Rng;
use tracing::debug;

use crate::formulas::calculate_damage;
use crate::model::{
    Character, CombatLogEntry, GameState, ItemEffect, LogKind, LogSource, StatusEffect,
};
use crate::rng::fresh_id;

/// Applies every effect of the item with id `item_id`.
///
/// Missing, effectless and broken items leave the state as it is. A
/// consumable is removed once used; durability is never touched here.
pub fn use_item<R: Rng + ?Sized>(state: &GameState, item_id: &str, rng: &mut R) -> GameState {
    let Some(item) = state.find_item(item_id) else {
        debug!(target: "chronos_core.items", item_id, "no such item");
        return state.clone();
    };
    if item.effects.is_empty() || item.is_broken() {
        debug!(target: "chronos_core.items", item = %item.name, "item cannot be used");
        return state.clone();
    }

    let mut next = state.clone();
    let mut summary = format!("Used {}:", item.name);

    for effect in &item.effects {
        match effect {
            ItemEffect::HealHp { value } => {
                next.player_hp = next
                    .player_hp
                    .saturating_add(*value)
                    .min(next.player_max_hp);
                summary.push_str(&format!(" Healed {value} HP."));
            }
            ItemEffect::HealMana { value } => {
                let stats = &mut next.player_stats;
                stats.mana = stats.mana.saturating_add(*value).min(stats.max_mana);
                summary.push_str(&format!(" Restored {value} Mana."));
            }
            ItemEffect::Buff { status_effect } => {
                next.player_active_effects.push(StatusEffect {
                    id: fresh_id(rng),
                    ..status_effect.clone()
                });
                summary.push_str(&format!(" Applied {}.", status_effect.name));
            }
            ItemEffect::CureStatus { target_attribute } => {
                let before = next.player_active_effects.len();
                next.player_active_effects
                    .retain(|effect| !cures(effect, target_attribute));
                if next.player_active_effects.len() < before {
                    summary.push_str(&format!(" Cured {target_attribute}."));
                }
            }
            ItemEffect::Damage { value, element } => {
                let Some(enemy) = next.combat_enemy.take() else {
                    continue;
                };
                let damage = calculate_damage(
                    *value,
                    &next.player_stats,
                    &enemy.resistances,
                    &enemy.weaknesses,
                    *element,
                    rng,
                );
                next.combat_enemy = Some(Character {
                    hp: Some(enemy.hp.unwrap_or(0).saturating_sub(damage)),
                    ..enemy
                });
                next.combat_log.push(CombatLogEntry {
                    text: format!("{} deals {damage} damage.", item.name),
                    kind: LogKind::Damage,
                    value: Some(damage),
                    source: LogSource::Player,
                    is_critical: None,
                    element: *element,
                });
                next.screen_shake = true;
                summary.push_str(&format!(" Dealt {damage} damage."));
            }
            ItemEffect::LearnSpell { spell_name } => {
                if next.knows_spell(spell_name) {
                    summary.push_str(&format!(" You already know {spell_name}."));
                } else {
                    next.known_spells.push(spell_name.clone());
                    summary.push_str(&format!(" Learned spell: {spell_name}!"));
                }
            }
        }
    }

    if item.consumable {
        next.inventory.retain(|i| i.id != item_id);
    }
    next.combat_log.push(CombatLogEntry {
        text: summary,
        kind: LogKind::Item,
        value: None,
        source: LogSource::Player,
        is_critical: None,
        element: None,
    });
    next
}

fn cures(effect: &StatusEffect, target: &str) -> bool {
    effect.name.eq_ignore_ascii_case(target)
        || effect
            .element
            .is_some_and(|element| element.name().eq_ignore_ascii_case(target))
}
