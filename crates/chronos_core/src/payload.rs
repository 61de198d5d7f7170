//! Contract for the structured turn result returned by the narrator.
//!
//! Every optional section maps to "no change" when absent. Nothing here is
//! trusted until [`TurnResult::check`] has passed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{CombatLogEntry, Element, ItemEffect, ItemType, Rarity, StatusEffect};

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("turn result is not valid JSON for the contract: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("turn result is missing required field `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    pub narrative: String,
    pub visual_description: String,
    pub suggested_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_updates: Option<InventoryUpdates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_updates: Option<CharacterUpdates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quest_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_appearance_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat_updates: Option<StatUpdates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spell_cooldown_updates: Option<Vec<CooldownUpdate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat_encounter: Option<CombatEncounter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat_round: Option<CombatRound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loot_dropped: Option<Vec<ItemStub>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_spells: Option<Vec<String>>,
}

impl TurnResult {
    pub fn from_json(raw: &str) -> Result<Self, PayloadError> {
        let result: TurnResult = serde_json::from_str(raw)?;
        result.check()?;
        Ok(result)
    }

    /// Rejects payloads whose required text came back blank. Serde already
    /// refuses payloads where the fields are absent altogether.
    pub fn check(&self) -> Result<(), PayloadError> {
        if self.narrative.trim().is_empty() {
            return Err(PayloadError::MissingField("narrative"));
        }
        if let Some(encounter) = &self.combat_encounter {
            if encounter.enemy_name.trim().is_empty() {
                return Err(PayloadError::MissingField("combatEncounter.enemyName"));
            }
        }
        Ok(())
    }

    /// A payload carrying only narrative, useful as a starting point.
    pub fn narrative_only(narrative: impl Into<String>) -> Self {
        Self {
            narrative: narrative.into(),
            ..Self::default()
        }
    }
}

/// Item description as the narrator sends it, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStub {
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

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InventoryUpdates {
    #[serde(default)]
    pub add: Vec<ItemStub>,
    #[serde(default)]
    pub remove: Vec<String>,
    #[serde(default)]
    pub update: Vec<DurabilityUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurabilityUpdate {
    pub name: String,
    pub new_durability: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharacterUpdates {
    #[serde(default)]
    pub add: Vec<CharacterStub>,
    #[serde(default)]
    pub remove: Vec<String>,
}

/// Character fields the narrator may set. Absent optionals leave an existing
/// character's value alone when merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterStub {
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resistances: Option<Vec<Element>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weaknesses: Option<Vec<Element>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatUpdates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp_change: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mana_change: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownUpdate {
    pub spell_name: String,
    pub cooldown: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatEncounter {
    pub enemy_name: String,
    #[serde(default)]
    pub enemy_description: String,
    pub enemy_hp: u32,
    #[serde(default)]
    pub enemy_abilities: Vec<String>,
    #[serde(default)]
    pub resistances: Vec<Element>,
    #[serde(default)]
    pub weaknesses: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatRound {
    #[serde(default)]
    pub is_combat_over: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<CombatLogEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_updates: Option<StatusUpdates>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusUpdates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<EffectChanges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enemy: Option<EffectChanges>,
}

/// Status-effect delta for one combatant. A present `remove` list, even an
/// empty one, also ages every remaining effect by one turn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EffectChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add: Option<Vec<StatusEffect>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<Vec<String>>,
}
