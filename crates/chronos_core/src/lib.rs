//! Combat resolution and state reconciliation for the narrative RPG.
//!
//! The narrator's structured turn result is untrusted input; everything in
//! this crate turns it into a consistent [`GameState`] without I/O.

pub mod biosphere;
pub mod diagnostics;
pub mod formulas;
pub mod items;
pub mod model;
pub mod payload;
pub mod reconcile;
pub mod rng;
pub mod validator;

pub use biosphere::{generate_biosphere, Biosphere, BiosphereGenerator};
pub use items::use_item;
pub use model::{
    Character, CombatLogEntry, EffectKind, Element, GameState, InventoryItem, ItemEffect,
    LogKind, LogSource, PlayerStats, StatusEffect,
};
pub use payload::{PayloadError, TurnResult};
pub use reconcile::{begin_turn, fail_turn, prepare_turn, reconcile, PreparedTurn};
pub use rng::{SimulationParams, SimulationRng, DEFAULT_SEED};
pub use validator::{sanitize, validate_integrity, IntegrityViolation};
