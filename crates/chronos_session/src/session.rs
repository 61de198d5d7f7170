//! The turn driver.
//!
//! [`GameSession`] owns the one mutable [`GameState`]. Every change goes
//! through a method here, so merges can never interleave.

use chronos_core::{
    begin_turn, fail_turn, prepare_turn, reconcile, use_item, GameState, SimulationParams,
    SimulationRng,
};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::SessionConfig;
use crate::narrator::{NarrationRequest, Narrator, NarratorError, SceneImager};
use crate::persistence::{PersistenceError, RestoreKind, SnapshotStore};
use crate::telemetry::{Severity, TelemetryEvent, TelemetryHandle};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a turn is already in flight")]
    TurnInFlight,
    #[error("session has no snapshot store")]
    NoStore,
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Applied { turn: u32 },
    Failed { reason: String },
}

/// Lowers the loading flags through the failure path if the turn future is
/// dropped while the narrator call is pending.
struct PendingTurn<'a> {
    state: &'a mut GameState,
    settled: bool,
}

impl<'a> PendingTurn<'a> {
    fn new(state: &'a mut GameState) -> Self {
        Self {
            state,
            settled: false,
        }
    }

    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(target: "chronos_session.session", "turn cancelled while awaiting the narrator");
            *self.state = fail_turn(self.state);
        }
    }
}

pub struct GameSession {
    state: GameState,
    rng: SimulationRng,
    /// Separate stream so trace ids never shift gameplay rolls.
    trace_rng: SimulationRng,
    store: Option<SnapshotStore>,
    telemetry: Option<TelemetryHandle>,
    visual_description: Option<String>,
}

impl GameSession {
    pub fn new(params: &SimulationParams) -> Self {
        Self::with_state(GameState::initial(), params)
    }

    pub fn with_state(state: GameState, params: &SimulationParams) -> Self {
        Self {
            state,
            rng: SimulationRng::from_params(params),
            trace_rng: SimulationRng::new(params.seed.rotate_left(32)),
            store: None,
            telemetry: None,
            visual_description: None,
        }
    }

    /// Seeded from the config (or `CHRONOS_SEED`) and saving to its
    /// `save_path`.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(&config.simulation_params())
            .with_store(SnapshotStore::new(config.session.save_path()))
    }

    pub fn with_store(mut self, store: SnapshotStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_telemetry(mut self, handle: TelemetryHandle) -> Self {
        self.telemetry = Some(handle);
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Runs one turn against `narrator`.
    ///
    /// A narrator or payload failure is not an error here: the state gets
    /// the failure narrative and [`TurnOutcome::Failed`] is returned. Dropping
    /// the future mid-call (a timeout, say) takes the same failure path.
    pub async fn play_turn(
        &mut self,
        action: &str,
        narrator: &dyn Narrator,
    ) -> Result<TurnOutcome, SessionError> {
        if self.state.is_loading {
            return Err(SessionError::TurnInFlight);
        }

        let turn = prepare_turn(&self.state, action);
        self.state = begin_turn(&self.state, &turn);
        let request = NarrationRequest::new(&self.state, &turn);

        let pending = PendingTurn::new(&mut self.state);
        let reply = narrator.narrate(&request).await.and_then(|result| {
            result.check()?;
            Ok::<_, NarratorError>(result)
        });
        pending.settle();

        match reply {
            Ok(result) => {
                let was_alive = self.state.player_hp > 0;
                self.state = reconcile(&self.state, turn, &result, &mut self.rng);
                self.visual_description = Some(result.visual_description);
                let turn_count = self.state.turn_count;
                self.emit(
                    Severity::Info,
                    json!({ "event": "turn_applied", "turn": turn_count, "action": action }),
                )
                .await;
                if was_alive && self.state.player_hp == 0 {
                    self.emit(
                        Severity::Critical,
                        json!({ "event": "player_fallen", "turn": turn_count }),
                    )
                    .await;
                }
                Ok(TurnOutcome::Applied { turn: turn_count })
            }
            Err(err) => {
                warn!(target: "chronos_session.session", %err, action, "turn failed");
                self.state = fail_turn(&self.state);
                let reason = err.to_string();
                self.emit(
                    Severity::Warn,
                    json!({ "event": "turn_failed", "reason": reason, "action": action }),
                )
                .await;
                Ok(TurnOutcome::Failed { reason })
            }
        }
    }

    /// Regenerates the scene image for the last narrated description.
    /// Returns whether the image changed; a failure only lowers the flag.
    pub async fn refresh_scene(&mut self, imager: &dyn SceneImager) -> bool {
        let Some(description) = self.visual_description.clone() else {
            return false;
        };
        self.state.image_loading = true;
        let appearance = self.state.player_visual_description.clone();
        let rendered = imager.render(&description, appearance.as_deref()).await;
        self.state.image_loading = false;
        match rendered {
            Ok(url) => {
                self.state.scene_image_url = Some(url);
                true
            }
            Err(err) => {
                warn!(target: "chronos_session.session", %err, "scene image failed");
                false
            }
        }
    }

    pub fn use_item(&mut self, item_id: &str) {
        self.state = use_item(&self.state, item_id, &mut self.rng);
    }

    pub fn complete_tutorial(&mut self) {
        self.state = self.state.complete_tutorial();
    }

    pub fn acknowledge_ui_triggers(&mut self) {
        self.state = self.state.acknowledge_ui_triggers();
    }

    /// Back to the initial state, dropping any saved snapshot.
    pub async fn reset(&mut self) -> Result<(), SessionError> {
        self.state = GameState::initial();
        self.visual_description = None;
        if let Some(store) = &self.store {
            store.clear()?;
        }
        info!(target: "chronos_session.session", "session reset");
        self.emit(Severity::Info, json!({ "event": "reset" })).await;
        Ok(())
    }

    pub fn save(&self) -> Result<(), SessionError> {
        let store = self.store.as_ref().ok_or(SessionError::NoStore)?;
        store.save(&self.state)?;
        Ok(())
    }

    pub fn restore(&mut self) -> Result<RestoreKind, SessionError> {
        let store = self.store.as_ref().ok_or(SessionError::NoStore)?;
        let restored = store.load()?;
        self.state = restored.state;
        Ok(restored.kind)
    }

    async fn emit(&mut self, severity: Severity, payload: serde_json::Value) {
        if let Some(telemetry) = &self.telemetry {
            let event = TelemetryEvent::new(severity, payload, &mut self.trace_rng);
            telemetry.record(event).await;
        }
    }
}
