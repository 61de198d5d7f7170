//! Monte Carlo check that damage rolls actually vary.

use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::formulas::calculate_damage;
use crate::model::PlayerStats;

pub const DEFAULT_ITERATIONS: usize = 10_000;
/// Standard deviation a healthy variance source must exceed.
pub const MIN_SIGMA: f64 = 0.5;

const PROBE_BASE_DAMAGE: u32 = 10;
const PROBE_STATS: PlayerStats = PlayerStats {
    str: 10,
    dex: 10,
    int: 10,
    mana: 10,
    max_mana: 10,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarianceReport {
    pub module: &'static str,
    pub iterations: usize,
    pub mean_damage: f64,
    pub sigma: f64,
    pub entropy_check: EntropyCheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntropyCheck {
    Pass,
    TooStatic,
}

pub fn run_damage_diagnostic<R: Rng + ?Sized>(iterations: usize, rng: &mut R) -> VarianceReport {
    let samples: Vec<f64> = (0..iterations)
        .map(|_| f64::from(calculate_damage(PROBE_BASE_DAMAGE, &PROBE_STATS, &[], &[], None, rng)))
        .collect();

    let count = samples.len().max(1) as f64;
    let mean = samples.iter().sum::<f64>() / count;
    let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / count;
    let sigma = variance.sqrt();
    let entropy_check = if sigma > MIN_SIGMA {
        EntropyCheck::Pass
    } else {
        EntropyCheck::TooStatic
    };

    info!(
        target: "chronos_core.diagnostics",
        iterations,
        mean,
        sigma,
        ?entropy_check,
        "damage variance diagnostic finished"
    );

    VarianceReport {
        module: "formulas::calculate_damage",
        iterations,
        mean_damage: mean,
        sigma,
        entropy_check,
    }
}
