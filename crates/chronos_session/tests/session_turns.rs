use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chronos_core::reconcile::FAILURE_NARRATIVE;
use chronos_core::{GameState, SimulationParams, TurnResult};
use chronos_session::{
    GameSession, NarrationRequest, Narrator, NarratorError, RestoreKind, SceneImager,
    ScriptedNarrator, ScriptedReply, SessionError, SnapshotStore, TelemetryBatcher, TracingSink,
    TurnOutcome,
};
use serde_json::{json, Value};

fn payload(narrative: &str, sections: Value) -> Value {
    let mut base = json!({
        "narrative": narrative,
        "visualDescription": format!("scene: {narrative}"),
        "suggestedActions": ["Press on"]
    });
    if let (Value::Object(base), Value::Object(extra)) = (&mut base, sections) {
        base.extend(extra);
    }
    base
}

struct FixedImager(Result<&'static str, &'static str>);

#[async_trait]
impl SceneImager for FixedImager {
    async fn render(
        &self,
        visual_description: &str,
        _player_appearance: Option<&str>,
    ) -> Result<String, NarratorError> {
        match self.0 {
            Ok(prefix) => Ok(format!("{prefix}{visual_description}")),
            Err(reason) => Err(NarratorError::Transport(reason.to_string())),
        }
    }
}

struct StalledNarrator;

#[async_trait]
impl Narrator for StalledNarrator {
    async fn narrate(&self, _request: &NarrationRequest) -> Result<TurnResult, NarratorError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(NarratorError::Exhausted)
    }
}

fn session() -> GameSession {
    GameSession::new(&SimulationParams::from_seed(42))
}

#[tokio::test]
async fn applied_turn_advances_the_game() {
    let mut session = session();
    let narrator = ScriptedNarrator::from_payloads([payload(
        "A wraith rises.",
        json!({ "combatEncounter": { "enemyName": "Wraith", "enemyHp": 15 } }),
    )]);

    let outcome = session.play_turn("Enter the dark forest", &narrator).await.unwrap();
    assert_eq!(TurnOutcome::Applied { turn: 1 }, outcome);

    let state = session.state();
    assert!(state.in_combat);
    assert!(!state.is_loading);
    assert_eq!("A wraith rises.", state.current_narrative);
    assert_eq!(vec!["Press on"], state.possible_actions);
    assert_eq!(0, narrator.remaining().await);
}

#[tokio::test]
async fn failed_turn_only_sets_the_error_narrative() {
    let mut session = session();
    let narrator = ScriptedNarrator::new([ScriptedReply::Failure("503".into())]);

    let outcome = session.play_turn("Cast Spark", &narrator).await.unwrap();
    assert!(matches!(outcome, TurnOutcome::Failed { reason } if reason.contains("503")));

    let state = session.state();
    let initial = GameState::initial();
    assert_eq!(FAILURE_NARRATIVE, state.current_narrative);
    assert!(!state.is_loading);
    assert!(!state.image_loading);
    assert_eq!(0, state.turn_count);
    assert!(state.history.is_empty());
    assert!(state.spell_history.is_empty());
    assert_eq!(initial.player_hp, state.player_hp);
    assert_eq!(Some("Spark".to_string()), state.last_spell_cast);
}

#[tokio::test]
async fn blank_narrative_is_treated_as_a_failure() {
    let mut session = session();
    let narrator = ScriptedNarrator::from_payloads([payload(
        "   ",
        json!({ "statUpdates": { "hpChange": -19 } }),
    )]);

    let outcome = session.play_turn("Jump", &narrator).await.unwrap();
    assert!(matches!(outcome, TurnOutcome::Failed { .. }));
    assert_eq!(20, session.state().player_hp);
}

#[tokio::test]
async fn a_pending_turn_blocks_the_next_one() {
    let mut loading = GameState::initial();
    loading.is_loading = true;
    let mut session = GameSession::with_state(loading, &SimulationParams::from_seed(1));
    let narrator = ScriptedNarrator::from_payloads([payload("Unused.", json!({}))]);

    let err = session.play_turn("Wait", &narrator).await.unwrap_err();
    assert!(matches!(err, SessionError::TurnInFlight));
    assert_eq!(1, narrator.remaining().await);
    assert!(narrator.requests().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn timed_out_turn_fails_and_frees_the_session() {
    let mut session = session();
    let timed_out = tokio::time::timeout(
        Duration::from_secs(1),
        session.play_turn("Cast Spark", &StalledNarrator),
    )
    .await;
    assert!(timed_out.is_err());

    let state = session.state();
    assert!(!state.is_loading);
    assert!(!state.image_loading);
    assert_eq!(FAILURE_NARRATIVE, state.current_narrative);
    assert_eq!(0, state.turn_count);
    assert_eq!(Some("Spark".to_string()), state.last_spell_cast);

    let narrator = ScriptedNarrator::from_payloads([payload("You try again.", json!({}))]);
    let outcome = session.play_turn("Walk", &narrator).await.unwrap();
    assert_eq!(TurnOutcome::Applied { turn: 1 }, outcome);
}

#[tokio::test]
async fn narrator_sees_decremented_cooldowns() {
    let mut state = GameState::initial();
    state.spell_cooldowns.insert("Spark".into(), 3);
    let mut session = GameSession::with_state(state, &SimulationParams::from_seed(2));
    let narrator = ScriptedNarrator::from_payloads([payload("Sparks fly.", json!({}))]);

    session.play_turn("Cast Spark", &narrator).await.unwrap();
    let requests = narrator.requests().await;
    assert_eq!(Some(&2), requests[0].spell_cooldowns.get("Spark"));
    assert_eq!(vec!["Spark"], requests[0].spell_history);
    assert_eq!(Some(&2), session.state().spell_cooldowns.get("Spark"));
}

#[tokio::test]
async fn same_seed_same_ids() {
    let script = || {
        ScriptedNarrator::from_payloads([payload(
            "Loot!",
            json!({ "lootDropped": [{ "name": "Potion", "consumable": true }] }),
        )])
    };
    let mut a = session();
    let mut b = session();
    a.play_turn("Search", &script()).await.unwrap();
    b.play_turn("Search", &script()).await.unwrap();
    assert_eq!(a.state().inventory[0].id, b.state().inventory[0].id);
}

#[tokio::test]
async fn scene_refresh_is_cosmetic() {
    let mut session = session();
    assert!(!session.refresh_scene(&FixedImager(Ok("img://"))).await);

    let narrator = ScriptedNarrator::from_payloads([payload("Dawn.", json!({}))]);
    session.play_turn("Wake", &narrator).await.unwrap();
    let before = session.state().clone();

    assert!(!session.refresh_scene(&FixedImager(Err("quota"))).await);
    assert_eq!(&before, session.state());

    assert!(session.refresh_scene(&FixedImager(Ok("img://"))).await);
    assert_eq!(
        Some("img://scene: Dawn."),
        session.state().scene_image_url.as_deref()
    );
    assert!(!session.state().image_loading);
}

#[tokio::test]
async fn items_and_tutorial_through_the_session() {
    let mut session = session();
    let narrator = ScriptedNarrator::from_payloads([payload(
        "You find a vial.",
        json!({
            "statUpdates": { "hpChange": -8 },
            "inventoryUpdates": { "add": [{
                "name": "Vial",
                "consumable": true,
                "effects": [{ "type": "heal_hp", "value": 5 }]
            }] }
        }),
    )]);
    session.play_turn("Search", &narrator).await.unwrap();
    assert_eq!(12, session.state().player_hp);

    let id = session.state().inventory[0].id.clone();
    session.use_item(&id);
    assert_eq!(17, session.state().player_hp);
    assert!(session.state().inventory.is_empty());

    session.complete_tutorial();
    assert!(session.state().combat_tutorial_seen);
}

#[tokio::test]
async fn save_restore_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("save.dat"));
    let mut session = session().with_store(store.clone());
    let narrator = ScriptedNarrator::from_payloads([payload(
        "The gate opens.",
        json!({ "questUpdate": "Enter the citadel" }),
    )]);
    session.play_turn("Push the gate", &narrator).await.unwrap();
    session.save().unwrap();

    let mut revived = GameSession::new(&SimulationParams::from_seed(9)).with_store(store.clone());
    assert_eq!(RestoreKind::Intact, revived.restore().unwrap());
    assert_eq!(session.state(), revived.state());
    assert_eq!("Enter the citadel", revived.state().current_quest);

    revived.reset().await.unwrap();
    assert_eq!(&GameState::initial(), revived.state());
    assert!(!store.exists());
    assert_eq!(RestoreKind::Missing, revived.restore().unwrap());
}

#[tokio::test]
async fn storeless_session_cannot_save() {
    let session = session();
    assert!(matches!(session.save(), Err(SessionError::NoStore)));
}

#[tokio::test]
async fn turns_are_reported_to_telemetry() {
    let batcher = TelemetryBatcher::new(Arc::new(TracingSink), 50, Duration::from_secs(60));
    let handle = batcher.handle();
    let mut session = session().with_telemetry(handle.clone());
    let narrator = ScriptedNarrator::new([
        ScriptedReply::Payload(payload("Ouch.", json!({ "statUpdates": { "hpChange": -25 } })).to_string()),
        ScriptedReply::Failure("offline".into()),
    ]);

    session.play_turn("Fall", &narrator).await.unwrap();
    session.play_turn("Get up", &narrator).await.unwrap();
    // applied + fallen + failed
    assert_eq!(3, handle.pending().await);
    assert_eq!(3, batcher.flush().await.unwrap());
}
