//! Game-state data model.
//!
//! Field names serialise in camelCase; the JSON form of [`GameState`] is the
//! persisted snapshot format.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SPELL_HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Fire,
    Ice,
    Lightning,
    Poison,
    Physical,
    Arcane,
    Earth,
    Wind,
    Holy,
    Dark,
}

impl Element {
    pub fn name(self) -> &'static str {
        match self {
            Element::Fire => "fire",
            Element::Ice => "ice",
            Element::Lightning => "lightning",
            Element::Poison => "poison",
            Element::Physical => "physical",
            Element::Arcane => "arcane",
            Element::Earth => "earth",
            Element::Wind => "wind",
            Element::Holy => "holy",
            Element::Dark => "dark",
        }
    }

    /// Elements this one has the advantage over.
    pub fn strong_against(self) -> &'static [Element] {
        match self {
            Element::Fire => &[Element::Ice, Element::Earth],
            Element::Ice => &[Element::Wind],
            Element::Lightning => &[Element::Wind],
            Element::Earth => &[Element::Lightning],
            Element::Wind => &[Element::Fire],
            Element::Arcane => &[Element::Dark],
            Element::Holy => &[Element::Dark],
            Element::Dark => &[Element::Holy],
            Element::Poison | Element::Physical => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Weapon,
    Armor,
    Consumable,
    Material,
    Key,
    Tome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    Buff,
    Debuff,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EffectKind,
    #[serde(default)]
    pub description: String,
    /// Turns remaining.
    pub duration: u32,
    #[serde(default)]
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<Element>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemEffect {
    HealHp {
        value: u32,
    },
    HealMana {
        value: u32,
    },
    Buff {
        #[serde(rename = "statusEffect")]
        status_effect: StatusEffect,
    },
    CureStatus {
        #[serde(rename = "targetAttribute")]
        target_attribute: String,
    },
    Damage {
        value: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        element: Option<Element>,
    },
    LearnSpell {
        #[serde(rename = "spellName")]
        spell_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub consumable: bool,
    #[serde(default)]
    pub effects: Vec<ItemEffect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_durability: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_durability: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<Rarity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ItemType>,
}

impl InventoryItem {
    /// An item with a durability budget that has been spent cannot be used.
    pub fn is_broken(&self) -> bool {
        self.max_durability.is_some() && self.current_durability == Some(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_hp: Option<u32>,
    #[serde(default)]
    pub active_effects: Vec<StatusEffect>,
    #[serde(default)]
    pub resistances: Vec<Element>,
    #[serde(default)]
    pub weaknesses: Vec<Element>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub str: u32,
    pub dex: u32,
    pub int: u32,
    pub mana: u32,
    pub max_mana: u32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            str: 10,
            dex: 10,
            int: 12,
            mana: 30,
            max_mana: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Damage,
    Heal,
    Miss,
    Spell,
    Info,
    EnemyMove,
    Effect,
    Ability,
    Item,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    Player,
    Enemy,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatLogEntry {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u32>,
    pub source: LogSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_critical: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<Element>,
}

impl CombatLogEntry {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: LogKind::Info,
            value: None,
            source: LogSource::System,
            is_critical: None,
            element: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
}

/// Aggregate root. Only the reconciler and the item/tutorial operations in
/// this crate produce new values of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameState {
    pub current_narrative: String,
    pub history: Vec<HistoryEntry>,
    #[serde(alias = "artifactRetentionMatrix")]
    pub inventory: Vec<InventoryItem>,
    pub known_characters: Vec<Character>,
    pub current_quest: String,
    pub scene_image_url: Option<String>,
    pub player_visual_description: Option<String>,
    pub possible_actions: Vec<String>,
    pub is_loading: bool,
    pub image_loading: bool,
    pub turn_count: u32,

    pub player_hp: u32,
    pub player_max_hp: u32,
    pub player_stats: PlayerStats,
    pub known_spells: Vec<String>,
    pub spell_cooldowns: BTreeMap<String, u32>,
    pub player_active_effects: Vec<StatusEffect>,
    pub spell_history: Vec<String>,

    pub in_combat: bool,
    pub combat_enemy: Option<Character>,
    pub combat_log: Vec<CombatLogEntry>,
    pub combat_tutorial_seen: bool,
    pub is_tutorial_active: bool,

    pub last_spell_cast: Option<String>,
    pub screen_shake: bool,
}

impl GameState {
    pub fn initial() -> Self {
        Self {
            current_narrative: "You stand at the threshold of the Unknown. The air hums with \
                potential. To your left, a dark forest whispers ancient secrets. To your right, \
                a ruined citadel silhouette against the blood-moon. What is your path?"
                .to_string(),
            history: Vec::new(),
            inventory: Vec::new(),
            known_characters: Vec::new(),
            current_quest: "Discover your destiny.".to_string(),
            scene_image_url: None,
            player_visual_description: None,
            possible_actions: vec![
                "Enter the dark forest".to_string(),
                "Approach the ruined citadel".to_string(),
                "Check your pockets".to_string(),
            ],
            is_loading: false,
            image_loading: false,
            turn_count: 0,
            player_hp: 20,
            player_max_hp: 20,
            player_stats: PlayerStats::default(),
            known_spells: vec!["Spark".to_string()],
            spell_cooldowns: BTreeMap::new(),
            player_active_effects: Vec::new(),
            spell_history: Vec::new(),
            in_combat: false,
            combat_enemy: None,
            combat_log: Vec::new(),
            combat_tutorial_seen: false,
            is_tutorial_active: false,
            last_spell_cast: None,
            screen_shake: false,
        }
    }

    pub fn find_item(&self, id: &str) -> Option<&InventoryItem> {
        self.inventory.iter().find(|item| item.id == id)
    }

    pub fn knows_spell(&self, name: &str) -> bool {
        self.known_spells.iter().any(|spell| spell == name)
    }

    /// Drops the one-shot animation triggers once the presentation layer has
    /// played them.
    pub fn acknowledge_ui_triggers(&self) -> Self {
        Self {
            last_spell_cast: None,
            screen_shake: false,
            ..self.clone()
        }
    }

    /// Marks the combat tutorial as seen for good.
    pub fn complete_tutorial(&self) -> Self {
        Self {
            is_tutorial_active: false,
            combat_tutorial_seen: true,
            ..self.clone()
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::initial()
    }
}
