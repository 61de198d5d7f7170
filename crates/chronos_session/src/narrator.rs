//! Ports to the remote narrative and image services.
//!
//! The session only ever talks to these traits. [`ScriptedNarrator`] replays
//! canned payloads for the CLI and for tests.

use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use chronos_core::model::{Character, HistoryEntry, PlayerStats, StatusEffect};
use chronos_core::{GameState, PayloadError, PreparedTurn, TurnResult};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum NarratorError {
    #[error("narrator call failed: {0}")]
    Transport(String),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error("no scripted reply left for this turn")]
    Exhausted,
}

/// Item as the narrator sees it: name and wear only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_durability: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_durability: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterSummary {
    pub name: String,
    pub role: String,
}

/// Context sent with every turn.
///
/// Cooldowns are already decremented for this turn and the spell history
/// already contains this turn's cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationRequest {
    pub history: Vec<HistoryEntry>,
    pub action: String,
    pub inventory: Vec<ItemSummary>,
    pub characters: Vec<CharacterSummary>,
    pub quest: String,
    pub appearance: Option<String>,
    pub hp: u32,
    pub max_hp: u32,
    pub stats: PlayerStats,
    pub known_spells: Vec<String>,
    pub spell_cooldowns: BTreeMap<String, u32>,
    pub in_combat: bool,
    pub enemy: Option<Character>,
    pub player_effects: Vec<StatusEffect>,
    pub spell_history: Vec<String>,
}

impl NarrationRequest {
    pub fn new(state: &GameState, turn: &PreparedTurn) -> Self {
        Self {
            history: state.history.clone(),
            action: turn.action.clone(),
            inventory: state
                .inventory
                .iter()
                .map(|item| ItemSummary {
                    name: item.name.clone(),
                    current_durability: item.current_durability,
                    max_durability: item.max_durability,
                })
                .collect(),
            characters: state
                .known_characters
                .iter()
                .map(|c| CharacterSummary {
                    name: c.name.clone(),
                    role: c.role.clone(),
                })
                .collect(),
            quest: state.current_quest.clone(),
            appearance: state.player_visual_description.clone(),
            hp: state.player_hp,
            max_hp: state.player_max_hp,
            stats: state.player_stats,
            known_spells: state.known_spells.clone(),
            spell_cooldowns: turn.spell_cooldowns.clone(),
            in_combat: state.in_combat,
            enemy: state.combat_enemy.clone(),
            player_effects: state.player_active_effects.clone(),
            spell_history: turn.spell_history.clone(),
        }
    }
}

#[async_trait]
pub trait Narrator: Send + Sync {
    async fn narrate(&self, request: &NarrationRequest) -> Result<TurnResult, NarratorError>;
}

/// Produces a scene image reference (url or data uri) for a description.
#[async_trait]
pub trait SceneImager: Send + Sync {
    async fn render(
        &self,
        visual_description: &str,
        player_appearance: Option<&str>,
    ) -> Result<String, NarratorError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Raw JSON as the remote service would return it.
    Payload(String),
    Failure(String),
}

/// Replays queued replies in order and keeps every request it was sent.
#[derive(Debug, Default)]
pub struct ScriptedNarrator {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<NarrationRequest>>,
}

impl ScriptedNarrator {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn from_payloads(payloads: impl IntoIterator<Item = serde_json::Value>) -> Self {
        Self::new(
            payloads
                .into_iter()
                .map(|payload| ScriptedReply::Payload(payload.to_string())),
        )
    }

    pub async fn push(&self, reply: ScriptedReply) {
        self.replies.lock().await.push_back(reply);
    }

    pub async fn remaining(&self) -> usize {
        self.replies.lock().await.len()
    }

    pub async fn requests(&self) -> Vec<NarrationRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl Narrator for ScriptedNarrator {
    async fn narrate(&self, request: &NarrationRequest) -> Result<TurnResult, NarratorError> {
        self.requests.lock().await.push(request.clone());
        match self.replies.lock().await.pop_front() {
            Some(ScriptedReply::Payload(raw)) => Ok(TurnResult::from_json(&raw)?),
            Some(ScriptedReply::Failure(reason)) => Err(NarratorError::Transport(reason)),
            None => Err(NarratorError::Exhausted),
        }
    }
}
