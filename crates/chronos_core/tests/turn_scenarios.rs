use chronos_core::model::{Character, GameState, LogKind, LogSource, StatusEffect};
use chronos_core::reconcile::{COMBAT_FINISHED, PLAYER_FALLEN};
use chronos_core::{prepare_turn, reconcile, validate_integrity, SimulationRng, TurnResult};
use serde_json::{json, Value};

fn turn_result(sections: Value) -> TurnResult {
    let mut payload = json!({
        "narrative": "The mist parts.",
        "visualDescription": "a misty glade",
        "suggestedActions": ["Wait", "Run"]
    });
    if let (Value::Object(base), Value::Object(extra)) = (&mut payload, sections) {
        base.extend(extra);
    }
    let result: TurnResult = serde_json::from_value(payload).expect("payload decodes");
    result.check().expect("payload is well formed");
    result
}

fn play(state: &GameState, action: &str, sections: Value) -> GameState {
    let turn = prepare_turn(state, action);
    let next = reconcile(state, turn, &turn_result(sections), &mut SimulationRng::new(11));
    assert!(validate_integrity(&next), "reconciled state must be valid");
    next
}

fn in_combat_with(enemy_hp: u32) -> GameState {
    let mut state = GameState::initial();
    state.in_combat = true;
    state.combat_enemy = Some(Character {
        id: "enemy".into(),
        name: "Wraith".into(),
        role: "Enemy".into(),
        description: String::new(),
        hp: Some(enemy_hp),
        max_hp: Some(enemy_hp),
        active_effects: Vec::new(),
        resistances: Vec::new(),
        weaknesses: Vec::new(),
    });
    state
}

fn effect(name: &str, duration: u32) -> Value {
    json!({ "id": name.to_lowercase(), "name": name, "type": "debuff", "duration": duration, "icon": "bolt" })
}

fn effect_summary(effects: &[StatusEffect]) -> Vec<(&str, u32)> {
    effects.iter().map(|e| (e.name.as_str(), e.duration)).collect()
}

#[test]
fn encounter_starts_combat_and_raises_tutorial() {
    let state = GameState::initial();
    let next = play(
        &state,
        "Enter the dark forest",
        json!({
            "combatEncounter": {
                "enemyName": "Wraith",
                "enemyDescription": "A shade of cold hate",
                "enemyHp": 15,
                "weaknesses": ["holy"]
            }
        }),
    );

    assert!(next.in_combat);
    let enemy = next.combat_enemy.as_ref().expect("enemy spawned");
    assert_eq!(Some(15), enemy.hp);
    assert_eq!(Some(15), enemy.max_hp);
    assert!(enemy.active_effects.is_empty());
    assert!(next
        .combat_log
        .iter()
        .any(|entry| entry.text == "Encounter started: Wraith" && entry.source == LogSource::System));
    assert!(next.is_tutorial_active);
}

#[test]
fn seen_tutorial_is_not_raised_again() {
    let mut state = GameState::initial();
    state.combat_tutorial_seen = true;
    let next = play(
        &state,
        "Fight",
        json!({ "combatEncounter": { "enemyName": "Wraith", "enemyHp": 15 } }),
    );
    assert!(!next.is_tutorial_active);
}

#[test]
fn tutorial_flag_stays_raised_until_completed() {
    let mut state = GameState::initial();
    state.is_tutorial_active = true;
    let next = play(&state, "Wait", json!({}));
    assert!(next.is_tutorial_active);
    assert!(!next.complete_tutorial().is_tutorial_active);
}

#[test]
fn death_overrides_combat_continuation() {
    let mut state = in_combat_with(20);
    state.player_hp = 3;
    let next = play(
        &state,
        "Block",
        json!({
            "statUpdates": { "hpChange": -5 },
            "combatRound": {
                "isCombatOver": false,
                "logs": [{ "text": "The wraith claws you", "type": "damage", "value": 5, "source": "enemy" }]
            }
        }),
    );

    assert_eq!(0, next.player_hp);
    assert!(!next.in_combat);
    assert!(next.screen_shake);
    assert_eq!(PLAYER_FALLEN, next.combat_log.last().unwrap().text);
}

#[test]
fn death_check_runs_without_a_combat_round() {
    let mut state = in_combat_with(20);
    state.player_hp = 3;
    let next = play(&state, "Stumble", json!({ "statUpdates": { "hpChange": -5 } }));
    assert_eq!(0, next.player_hp);
    assert!(!next.in_combat);
    assert!(next.screen_shake);
    assert!(next.combat_log.iter().any(|e| e.text == PLAYER_FALLEN));
}

#[test]
fn player_damage_comes_off_enemy_hp() {
    let state = in_combat_with(15);
    let next = play(
        &state,
        "Cast Spark",
        json!({
            "combatRound": {
                "isCombatOver": false,
                "logs": [
                    { "text": "Spark hits", "type": "damage", "value": 6, "source": "player", "element": "lightning" },
                    { "text": "Spark fizzles", "type": "damage", "source": "player" },
                    { "text": "The wraith wails", "type": "info", "source": "enemy" }
                ]
            }
        }),
    );
    assert_eq!(Some(9), next.combat_enemy.as_ref().unwrap().hp);
    assert!(next.screen_shake);
    assert!(next.in_combat);
    assert_eq!(3, next.combat_log.len());
    assert_eq!(Some("Spark".to_string()), next.spell_history.last().cloned());
}

#[test]
fn enemy_hp_floors_at_zero_on_overkill() {
    let state = in_combat_with(4);
    let next = play(
        &state,
        "Smite",
        json!({
            "combatRound": {
                "isCombatOver": false,
                "logs": [{ "text": "Smite!", "type": "damage", "value": 30, "source": "player", "isCritical": true }]
            }
        }),
    );
    assert_eq!(Some(0), next.combat_enemy.unwrap().hp);
}

#[test]
fn non_player_damage_only_shakes() {
    let state = in_combat_with(10);
    let next = play(
        &state,
        "Brace",
        json!({
            "combatRound": {
                "isCombatOver": false,
                "logs": [{ "text": "Rocks fall", "type": "damage", "value": 2, "source": "system" }]
            }
        }),
    );
    assert_eq!(Some(10), next.combat_enemy.unwrap().hp);
    assert!(next.screen_shake);
}

#[test]
fn combat_over_clears_the_enemy() {
    let state = in_combat_with(2);
    let next = play(
        &state,
        "Finish it",
        json!({
            "combatRound": {
                "isCombatOver": true,
                "logs": [{ "text": "Final blow", "type": "damage", "value": 2, "source": "player" }]
            }
        }),
    );
    assert!(!next.in_combat);
    assert!(next.combat_enemy.is_none());
    assert_eq!(COMBAT_FINISHED, next.combat_log.last().unwrap().text);
}

#[test]
fn round_logs_append_in_combat_and_replace_outside() {
    let mut fighting = in_combat_with(10);
    fighting.combat_log.push(chronos_core::CombatLogEntry::system("earlier round"));
    let round = json!({
        "combatRound": {
            "isCombatOver": false,
            "logs": [{ "text": "You dodge", "type": "miss", "source": "enemy" }]
        }
    });

    let next = play(&fighting, "Dodge", round.clone());
    let texts: Vec<_> = next.combat_log.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(vec!["earlier round", "You dodge"], texts);

    let mut calm = GameState::initial();
    calm.combat_log.push(chronos_core::CombatLogEntry::system("old fight"));
    let next = play(&calm, "Dodge", round);
    let texts: Vec<_> = next.combat_log.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(vec!["You dodge"], texts);
    assert_eq!(LogKind::Miss, next.combat_log[0].kind);
}

#[test]
fn status_removal_also_ages_remaining_effects() {
    let mut state = in_combat_with(10);
    state.player_active_effects =
        serde_json::from_value(json!([effect("Burning", 3), effect("Slowed", 1), effect("Hex", 5)]))
            .unwrap();

    let next = play(
        &state,
        "Roll on the ground",
        json!({
            "combatRound": {
                "isCombatOver": false,
                "statusUpdates": {
                    "player": { "add": [effect("Burning", 9), effect("Shielded", 2)], "remove": ["Hex"] },
                    "enemy": { "add": [effect("Stunned", 1)] }
                }
            }
        }),
    );

    // Burning is not duplicated; Slowed expires; the new Shielded ages too.
    assert_eq!(
        vec![("Burning", 2), ("Shielded", 1)],
        effect_summary(&next.player_active_effects)
    );
    let enemy = next.combat_enemy.unwrap();
    assert_eq!(vec![("Stunned", 1)], effect_summary(&enemy.active_effects));
}

#[test]
fn effects_do_not_age_without_a_removal_list() {
    let mut state = in_combat_with(10);
    state.player_active_effects = serde_json::from_value(json!([effect("Hex", 2)])).unwrap();
    let next = play(
        &state,
        "Wait",
        json!({
            "combatRound": {
                "isCombatOver": false,
                "statusUpdates": { "player": { "add": [] } }
            }
        }),
    );
    assert_eq!(vec![("Hex", 2)], effect_summary(&next.player_active_effects));
}

#[test]
fn inventory_merge_order() {
    let state = GameState::initial();
    let first = play(
        &state,
        "Loot the camp",
        json!({
            "inventoryUpdates": {
                "add": [
                    { "name": "Sword", "description": "Notched", "consumable": false, "effects": [], "maxDurability": 5 },
                    { "name": "Sword", "description": "Rusty", "consumable": false, "effects": [], "maxDurability": 3 }
                ]
            },
            "lootDropped": [
                { "name": "Potion", "consumable": true, "effects": [{ "type": "heal_hp", "value": 5 }], "rarity": "common" }
            ]
        }),
    );
    assert_eq!(3, first.inventory.len());
    assert_eq!(Some(5), first.inventory[0].current_durability);
    assert_ne!(first.inventory[0].id, first.inventory[1].id);

    let second = play(
        &first,
        "Parry",
        json!({
            "inventoryUpdates": {
                "update": [
                    { "name": "Sword", "newDurability": 2 },
                    { "name": "Shield", "newDurability": 1 }
                ],
                "remove": ["Potion"]
            }
        }),
    );
    let durability: Vec<_> = second
        .inventory
        .iter()
        .map(|item| (item.name.as_str(), item.current_durability))
        .collect();
    assert_eq!(vec![("Sword", Some(2)), ("Sword", Some(3))], durability);
}

#[test]
fn durability_update_cannot_exceed_maximum() {
    let state = play(
        &GameState::initial(),
        "Pick up",
        json!({ "inventoryUpdates": { "add": [{ "name": "Bow", "maxDurability": 4, "currentDurability": 1 }] } }),
    );
    let next = play(
        &state,
        "Repair",
        json!({ "inventoryUpdates": { "update": [{ "name": "Bow", "newDurability": 40 }] } }),
    );
    assert_eq!(Some(4), next.inventory[0].current_durability);
}

#[test]
fn characters_merge_by_name() {
    let state = play(
        &GameState::initial(),
        "Talk",
        json!({
            "characterUpdates": {
                "add": [
                    { "name": "Mira", "role": "Guide", "description": "A lantern bearer", "hp": 12 },
                    { "name": "Old Tom", "role": "Hermit", "description": "Mutters" }
                ]
            }
        }),
    );
    assert_eq!(2, state.known_characters.len());
    let mira_id = state.known_characters[0].id.clone();

    let next = play(
        &state,
        "Ask Mira",
        json!({
            "characterUpdates": {
                "add": [{ "name": "Mira", "role": "Traitor", "description": "Her lantern dims", "weaknesses": ["dark"] }],
                "remove": ["Old Tom"]
            }
        }),
    );
    assert_eq!(1, next.known_characters.len());
    let mira = &next.known_characters[0];
    assert_eq!(mira_id, mira.id);
    assert_eq!("Traitor", mira.role);
    assert_eq!(Some(12), mira.hp);
    assert_eq!(vec![chronos_core::Element::Dark], mira.weaknesses);
}

#[test]
fn spells_cooldowns_and_text_updates() {
    let mut state = GameState::initial();
    state.spell_cooldowns.insert("Spark".into(), 2);
    let next = play(
        &state,
        "Cast Spark",
        json!({
            "newSpells": ["Spark", "Frost Nova", "Frost Nova"],
            "spellCooldownUpdates": [{ "spellName": "Frost Nova", "cooldown": 3 }],
            "questUpdate": "Find the lantern",
            "playerAppearanceUpdate": ""
        }),
    );
    assert_eq!(vec!["Spark", "Frost Nova"], next.known_spells);
    assert_eq!(Some(&1), next.spell_cooldowns.get("Spark"));
    assert_eq!(Some(&3), next.spell_cooldowns.get("Frost Nova"));
    assert_eq!("Find the lantern", next.current_quest);
    assert_eq!(None, next.player_visual_description);
    assert_eq!(vec!["Spark"], next.spell_history);
}

#[test]
fn zero_cooldown_update_clears_the_entry() {
    let mut state = GameState::initial();
    state.spell_cooldowns.insert("Spark".into(), 4);
    state.spell_cooldowns.insert("Frost Nova".into(), 3);
    let next = play(
        &state,
        "Rest",
        json!({
            "spellCooldownUpdates": [
                { "spellName": "Spark", "cooldown": 0 },
                { "spellName": "Ember", "cooldown": 0 }
            ]
        }),
    );
    assert!(!next.spell_cooldowns.contains_key("Spark"));
    assert!(!next.spell_cooldowns.contains_key("Ember"));
    assert_eq!(Some(&2), next.spell_cooldowns.get("Frost Nova"));
    assert!(next.spell_cooldowns.values().all(|turns| *turns > 0));
}

#[test]
fn ambush_logs_the_round_before_the_encounter() {
    let mut calm = GameState::initial();
    calm.combat_log.push(chronos_core::CombatLogEntry::system("old fight"));
    let next = play(
        &calm,
        "Open the chest",
        json!({
            "combatEncounter": { "enemyName": "Mimic", "enemyHp": 15 },
            "combatRound": {
                "isCombatOver": false,
                "logs": [
                    { "text": "The chest bites", "type": "damage", "value": 2, "source": "enemy" },
                    { "text": "You kick it for 4", "type": "damage", "value": 4, "source": "player" }
                ]
            }
        }),
    );

    let texts: Vec<_> = next.combat_log.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(
        vec!["The chest bites", "You kick it for 4", "Encounter started: Mimic"],
        texts
    );
    assert!(next.in_combat);
    assert_eq!(Some(11), next.combat_enemy.as_ref().and_then(|enemy| enemy.hp));
    assert!(next.screen_shake);
}

#[test]
fn absent_sections_change_nothing_else() {
    let mut state = GameState::initial();
    state.player_hp = 7;
    state.player_stats.mana = 4;
    let next = play(&state, "Look around", json!({}));

    assert_eq!(1, next.turn_count);
    assert_eq!("The mist parts.", next.current_narrative);
    assert_eq!(vec!["Wait", "Run"], next.possible_actions);
    assert_eq!(2, next.history.len());
    assert_eq!(7, next.player_hp);
    assert_eq!(4, next.player_stats.mana);
    assert_eq!(state.inventory, next.inventory);
    assert_eq!(state.known_spells, next.known_spells);
    assert_eq!(state.current_quest, next.current_quest);
    assert!(!next.screen_shake);
    assert!(!next.is_loading);
}

#[test]
fn snapshot_round_trip_is_lossless() {
    let state = play(
        &in_combat_with(12),
        "Cast Spark",
        json!({
            "inventoryUpdates": { "add": [{ "name": "Torch", "maxDurability": 3, "itemType": "material" }] },
            "combatRound": {
                "isCombatOver": false,
                "logs": [{ "text": "Spark hits", "type": "damage", "value": 3, "source": "player", "element": "lightning" }],
                "statusUpdates": { "enemy": { "add": [effect("Shocked", 2)] } }
            }
        }),
    );

    let raw = serde_json::to_string(&state).unwrap();
    let restored: GameState = serde_json::from_str(&raw).unwrap();
    assert!(validate_integrity(&restored));
    assert_eq!(state, restored);
}
