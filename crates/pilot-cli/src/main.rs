use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use pilot_core::connection::SimConnection;
use pilot_core::dispatch::CommandDispatcher;
use pilot_core::phase::{FlightController, FlightPhase};
use pilot_core::PilotConfig;
use pilot_sim::{SimAircraftConfig, SimulatedAircraft};

#[derive(Debug, Parser)]
#[command(
    name = "pilot",
    version,
    about = "airpilot - phase-driven autopilot for a simulated aircraft"
)]
struct Cli {
    /// TOML config file. Built-in defaults apply if it does not exist.
    #[arg(long, default_value = "pilot.toml")]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration and exit.
    Doctor,
    /// Fly the built-in simulated aircraft under the phase controller.
    Run {
        /// Engage the hold-short directive from the start.
        #[arg(long)]
        hold_short: bool,
        /// Hand the aircraft into the air once the taxi roll is under way.
        #[arg(long)]
        auto_rotate: bool,
    },
}

#[derive(Debug, Default, serde::Deserialize)]
struct Config {
    #[serde(default)]
    logging: LoggingCfg,
    #[serde(default)]
    controller: PilotConfig,
    #[serde(default)]
    sim: SimAircraftConfig,
}

#[derive(Debug, serde::Deserialize)]
struct LoggingCfg {
    #[serde(default = "default_log_level")]
    level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingCfg {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

fn load_config(path: &str) -> Result<Config> {
    if !std::path::Path::new(path).exists() {
        return Ok(Config::default());
    }
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {}", path))?;
    toml::from_str(&s).context("parse config toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    // RUST_LOG wins over the configured level.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.cmd {
        Command::Doctor => doctor(&cfg),
        Command::Run { hold_short, auto_rotate } => run(cfg, hold_short, auto_rotate).await,
    }
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    cfg.controller.validate().context("controller config")?;

    anyhow::ensure!(
        (20.0..=120.0).contains(&cfg.sim.rotate_speed_kts),
        "sim.rotate_speed_kts out of range 20..=120 (got {})",
        cfg.sim.rotate_speed_kts
    );
    anyhow::ensure!(
        cfg.sim.field_elevation_ft.is_finite(),
        "sim.field_elevation_ft is not a number"
    );
    anyhow::ensure!(
        (cfg.controller.target_altitude_feet as f64) > cfg.sim.field_elevation_ft,
        "controller.target_altitude_feet ({}) must be above sim.field_elevation_ft ({})",
        cfg.controller.target_altitude_feet,
        cfg.sim.field_elevation_ft
    );

    info!("doctor: OK");
    Ok(())
}

async fn run(cfg: Config, hold_short: bool, auto_rotate: bool) -> Result<()> {
    let mut ctl_cfg = cfg.controller.clone();
    if hold_short {
        ctl_cfg.hold_short = true;
    }
    ctl_cfg.validate().context("controller config")?;

    let sim = Arc::new(SimulatedAircraft::new(cfg.sim.clone()));
    let dispatcher = Arc::new(CommandDispatcher::new(sim.clone()));
    let controller = FlightController::new(sim.clone(), dispatcher, &ctl_cfg);

    // Integrate the model at 10 Hz, independent of the 5 Hz control tick.
    let sim_step = sim.clone();
    let model_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(100));
        loop {
            ticker.tick().await;
            sim_step.step(0.1);
        }
    });

    // Mirror phase transitions onto stdout.
    let mut phases = controller.subscribe_phase_changes();
    let phase_task = tokio::spawn(async move {
        while let Ok(phase) = phases.recv().await {
            println!("phase: {:?}", phase);
        }
    });

    controller.start();
    info!("run: loop started, ctrl-c to stop");

    let mut status = tokio::time::interval(Duration::from_secs(1));
    let mut rotated = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("run: ctrl-c");
                break;
            }
            _ = status.tick() => {
                let Some(s) = sim.latest_snapshot() else { continue };

                if auto_rotate
                    && !rotated
                    && controller.current_phase() == FlightPhase::Taxi
                    && s.ground_speed_kts > 2.0
                {
                    info!("run: auto-rotate, handing the aircraft into the air");
                    sim.lift_off();
                    rotated = true;
                }

                let ts_ms =
                    time::OffsetDateTime::now_utc().unix_timestamp_nanos() as i64 / 1_000_000;
                println!(
                    "[{}] phase={:?} alt={:.0}ft ias={:.0}kt gs={:.1}kt hdg={:.0} park={} rpm={:.0}",
                    ts_ms,
                    controller.current_phase(),
                    s.altitude_ft,
                    s.indicated_airspeed_kts,
                    s.ground_speed_kts,
                    s.heading_mag_deg,
                    if s.parking_brake_on { "on" } else { "off" },
                    s.engine1_rpm
                );
            }
        }
    }

    controller.stop();
    model_task.abort();
    phase_task.abort();
    Ok(())
}
