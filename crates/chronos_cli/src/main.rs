use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use chronos_core::diagnostics::{run_damage_diagnostic, DEFAULT_ITERATIONS};
use chronos_core::{BiosphereGenerator, SimulationRng};
use chronos_session::{
    audit_saves, decode_snapshot, GameSession, ScriptedNarrator, ScriptedReply, SessionConfig,
    TelemetryBatcher, TracingSink, TurnOutcome,
};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chronos", version, about = "Headless driver for the narrative combat core")]
struct Cli {
    /// TOML config; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON script of turns and print the final state.
    Play(PlayArgs),
    /// Print a generated biosphere.
    Worldgen(WorldgenArgs),
    /// Run the damage variance diagnostic.
    Diagnose(DiagnoseArgs),
    /// Check every snapshot under a directory.
    Audit(AuditArgs),
    /// One-line summary of a snapshot file.
    Inspect(InspectArgs),
}

#[derive(Args)]
struct PlayArgs {
    #[arg(long)]
    script: PathBuf,
    /// Restore from and save to the configured save path.
    #[arg(long)]
    save: bool,
}

#[derive(Args)]
struct WorldgenArgs {
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    width: Option<usize>,
    #[arg(long)]
    height: Option<usize>,
    #[arg(long)]
    fill: Option<u32>,
}

#[derive(Args)]
struct DiagnoseArgs {
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args)]
struct AuditArgs {
    #[arg(long)]
    dir: PathBuf,
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long)]
    id: Option<String>,
}

#[derive(Args)]
struct InspectArgs {
    #[arg(long)]
    input: PathBuf,
}

/// One scripted turn: the action and either the narrator's payload or a
/// simulated failure.
#[derive(Debug, Deserialize)]
struct ScriptTurn {
    action: String,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    failure: Option<String>,
}

impl ScriptTurn {
    fn reply(&self) -> ScriptedReply {
        match (&self.result, &self.failure) {
            (Some(result), _) => ScriptedReply::Payload(result.to_string()),
            (None, Some(reason)) => ScriptedReply::Failure(reason.clone()),
            (None, None) => ScriptedReply::Failure(format!("no result scripted for `{}`", self.action)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config);
    match cli.command {
        Commands::Play(args) => handle_play(&config, args).await,
        Commands::Worldgen(args) => handle_worldgen(&config, args),
        Commands::Diagnose(args) => handle_diagnose(&config, args),
        Commands::Audit(args) => handle_audit(args),
        Commands::Inspect(args) => handle_inspect(args),
    }
}

fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::from_path(path),
        None => Ok(SessionConfig::default()),
    }
}

fn init_tracing(config: &SessionConfig) {
    if !config.telemetry.trace_enabled() {
        return;
    }
    let filter = match config.telemetry.trace_filter.as_deref() {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

async fn handle_play(config: &SessionConfig, args: PlayArgs) -> Result<()> {
    let data = fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read script {}", args.script.display()))?;
    let turns: Vec<ScriptTurn> = serde_json::from_str(&data)
        .with_context(|| format!("invalid script {}", args.script.display()))?;

    let mut batcher = TelemetryBatcher::from_config(&config.telemetry, Arc::new(TracingSink));
    batcher.start();

    let mut session = if args.save {
        let mut session = GameSession::from_config(config);
        let kind = session.restore()?;
        info!(target: "chronos_cli", ?kind, "snapshot restored");
        session
    } else {
        GameSession::new(&config.simulation_params())
    }
    .with_telemetry(batcher.handle());

    let narrator = ScriptedNarrator::new(turns.iter().map(ScriptTurn::reply));
    for turn in &turns {
        match session.play_turn(&turn.action, &narrator).await? {
            TurnOutcome::Applied { turn: count } => {
                info!(target: "chronos_cli", turn = count, action = %turn.action, "turn applied")
            }
            TurnOutcome::Failed { reason } => {
                info!(target: "chronos_cli", %reason, action = %turn.action, "turn failed")
            }
        }
        session.acknowledge_ui_triggers();
    }

    if args.save {
        session.save()?;
        info!(target: "chronos_cli", path = %config.session.save_path().display(), "snapshot written");
    }
    batcher.stop().await;
    println!("{}", serde_json::to_string_pretty(session.state())?);
    Ok(())
}

fn handle_worldgen(config: &SessionConfig, args: WorldgenArgs) -> Result<()> {
    let seed = args.seed.unwrap_or_else(|| config.simulation_params().seed);
    let generator = BiosphereGenerator::new(
        args.width.unwrap_or_else(|| config.world.width()),
        args.height.unwrap_or_else(|| config.world.height()),
    );
    let biosphere = generator.generate(seed, args.fill.unwrap_or_else(|| config.world.fill_percent()));
    for row in biosphere.render_rows() {
        println!("{row}");
    }
    Ok(())
}

fn handle_diagnose(config: &SessionConfig, args: DiagnoseArgs) -> Result<()> {
    let seed = args.seed.unwrap_or_else(|| config.simulation_params().seed);
    let report = run_damage_diagnostic(args.iterations, &mut SimulationRng::new(seed));
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn handle_audit(args: AuditArgs) -> Result<()> {
    let run_id = args
        .id
        .unwrap_or_else(|| format!("audit-{}", Utc::now().format("%Y%m%dT%H%M%S")));
    let report = audit_saves(&args.dir, run_id)?;
    let rendered = serde_json::to_string_pretty(&report)?;
    println!("{rendered}");

    if let Some(out) = args.out.as_ref() {
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(out, &rendered)?;
        println!("Report written to {}", out.display());
    }
    Ok(())
}

fn handle_inspect(args: InspectArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read snapshot {}", args.input.display()))?;
    let restored = decode_snapshot(&raw);
    let state = &restored.state;
    println!(
        "Snapshot {} -> {:?}: turn {}, hp {}/{}, mana {}/{}, {} item(s), in combat: {}",
        args.input.display(),
        restored.kind,
        state.turn_count,
        state.player_hp,
        state.player_max_hp,
        state.player_stats.mana,
        state.player_stats.max_mana,
        state.inventory.len(),
        state.in_combat
    );
    Ok(())
}
