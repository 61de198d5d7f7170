//! Damage, healing and status-effect math.
//!
//! Every function is pure apart from the rng it is handed; pass a seeded
//! [`SimulationRng`](crate::rng::SimulationRng) to replay rolls.

use rand::Rng;

use crate::model::{Element, PlayerStats, StatusEffect};

pub const DAMAGE_VARIANCE_MIN: f64 = 0.55;
pub const DAMAGE_VARIANCE_MAX: f64 = 1.15;
pub const HEALING_VARIANCE_MIN: f64 = 0.9;
pub const HEALING_VARIANCE_MAX: f64 = 1.1;
pub const BASE_CRIT_CHANCE: u32 = 5;
pub const POISON_TICK: u32 = 2;
pub const BURN_TICK: u32 = 3;
pub const MAX_MANA_DISCOUNT: f64 = 0.20;

const WEAKNESS_MULTIPLIER: f64 = 2.0;
const RESISTANCE_MULTIPLIER: f64 = 0.5;
const ADVANTAGE_MULTIPLIER: f64 = 1.5;

pub fn damage_variance<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(DAMAGE_VARIANCE_MIN..=DAMAGE_VARIANCE_MAX)
}

/// Final damage for one hit, never below 1.
///
/// ```text
/// floor(base * variance * elemental * (1 + stat / 100))
/// ```
///
/// `stat` is STR for physical attacks and INT for everything else, including
/// attacks without an element. The elemental multiplier only applies when an
/// element is given.
pub fn calculate_damage<R: Rng + ?Sized>(
    base_damage: u32,
    attacker: &PlayerStats,
    resistances: &[Element],
    weaknesses: &[Element],
    element: Option<Element>,
    rng: &mut R,
) -> u32 {
    let variance = damage_variance(rng);
    let elemental = element
        .map(|element| elemental_multiplier(element, resistances, weaknesses))
        .unwrap_or(1.0);
    let stat = match element {
        Some(Element::Physical) => attacker.str,
        _ => attacker.int,
    };
    let stat_bonus = 1.0 + f64::from(stat) / 100.0;

    let damage = (f64::from(base_damage) * variance * elemental * stat_bonus).floor();
    (damage as u32).max(1)
}

/// Crit chance is `5 + 2 * dex` percent against a roll in `[0, 100)`.
pub fn calculate_critical_hit<R: Rng + ?Sized>(dex: u32, rng: &mut R) -> bool {
    let chance = f64::from(BASE_CRIT_CHANCE.saturating_add(dex.saturating_mul(2)));
    let roll: f64 = rng.gen_range(0.0..100.0);
    roll < chance
}

/// Weakness is checked before resistance, so an element listed in both
/// still doubles.
pub fn elemental_multiplier(element: Element, resistances: &[Element], weaknesses: &[Element]) -> f64 {
    if weaknesses.contains(&element) {
        return WEAKNESS_MULTIPLIER;
    }
    if resistances.contains(&element) {
        return RESISTANCE_MULTIPLIER;
    }
    if element
        .strong_against()
        .iter()
        .any(|strong| resistances.contains(strong))
    {
        return ADVANTAGE_MULTIPLIER;
    }
    1.0
}

/// Damage over time from poison and burn effects.
pub fn status_effect_damage(effects: &[StatusEffect]) -> u32 {
    effects
        .iter()
        .map(|effect| match effect.element {
            Some(Element::Poison) => POISON_TICK,
            Some(Element::Fire) => BURN_TICK,
            _ => 0,
        })
        .sum()
}

/// Ages every effect by one turn and drops the expired ones, keeping order.
pub fn reduce_status_effect_durations(effects: Vec<StatusEffect>) -> Vec<StatusEffect> {
    effects
        .into_iter()
        .filter_map(|mut effect| {
            effect.duration = effect.duration.saturating_sub(1);
            (effect.duration > 0).then_some(effect)
        })
        .collect()
}

pub fn calculate_healing<R: Rng + ?Sized>(base_healing: u32, int: u32, rng: &mut R) -> u32 {
    let int_bonus = 1.0 + f64::from(int) / 100.0;
    let variance: f64 = rng.gen_range(HEALING_VARIANCE_MIN..=HEALING_VARIANCE_MAX);
    (f64::from(base_healing) * int_bonus * variance).floor() as u32
}

/// INT shaves up to 20% off a spell's cost; a spell always costs at least 1.
pub fn calculate_mana_cost(base_cost: u32, int: u32) -> u32 {
    let discount = (f64::from(int) / 100.0).min(MAX_MANA_DISCOUNT);
    ((f64::from(base_cost) * (1.0 - discount)).floor() as u32).max(1)
}

/// Reward multiplier for winning quickly.
pub fn combat_bonus(victory: bool, turn_count: u32) -> f64 {
    match (victory, turn_count) {
        (false, _) => 0.0,
        (true, 0..=3) => 1.5,
        (true, 4..=6) => 1.2,
        (true, _) => 1.0,
    }
}
