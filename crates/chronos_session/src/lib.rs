//! Orchestration around the pure core: configuration, the turn driver,
//! remote-service ports, snapshot storage, save audits and telemetry.

pub mod config;
pub mod narrator;
pub mod persistence;
pub mod report;
pub mod session;
pub mod telemetry;

pub use config::{SessionConfig, SessionSection, TelemetryConfig, WorldConfig};
pub use narrator::{
    NarrationRequest, Narrator, NarratorError, SceneImager, ScriptedNarrator, ScriptedReply,
};
pub use persistence::{decode_snapshot, PersistenceError, RestoreKind, Restored, SnapshotStore};
pub use report::{audit_saves, CheckResult, CheckStatus, ReportStatus, SaveAuditReport};
pub use session::{GameSession, SessionError, TurnOutcome};
pub use telemetry::{
    Severity, TelemetryBatcher, TelemetryError, TelemetryEvent, TelemetryHandle, TelemetrySink,
    TracingSink,
};
