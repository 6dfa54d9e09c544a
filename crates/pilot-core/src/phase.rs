use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::info;

use crate::altitude::suggest_throttle;
use crate::connection::SimConnection;
use crate::dispatch::CommandDispatcher;
use crate::telemetry::TelemetrySnapshot;
use crate::PilotConfig;

/// Tick cadence of the control loop (5 Hz).
pub const TICK_PERIOD: Duration = Duration::from_millis(200);

const TAKEOFF_THROTTLE_PCT: f64 = 90.0;
const TAXI_THROTTLE_PCT: f64 = 5.0;
const TAXI_OVERSPEED_MARGIN_KTS: f64 = 2.0;
const TAXI_STOPPED_KTS: f64 = 0.5;
const TAXI_STOPPED_AFTER: Duration = Duration::from_secs(2);
const CRUISE_CAPTURE_FT: f64 = 300.0;

/// Operating mode of the controller. Descent through Park are declared
/// extension points: no transition targets or leaves them yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightPhase {
    Idle,
    Taxi,
    Takeoff,
    Climb,
    Cruise,
    Descent,
    Approach,
    Landing,
    TaxiIn,
    Park,
}

/// Per-tick transition logic. Owned by `FlightController` behind a mutex so
/// ticks and lifecycle calls are serialized; never touched concurrently.
struct PhaseEngine {
    conn: Arc<dyn SimConnection>,
    dispatcher: Arc<CommandDispatcher>,
    target_alt_ft: f64,
    taxi_speed_max_kts: f64,
    hold_short: Arc<AtomicBool>,
    phase: FlightPhase,
    /// When ground speed first dropped below the stopped threshold.
    stopped_since: Option<Instant>,
    phase_tx: broadcast::Sender<FlightPhase>,
}

impl PhaseEngine {
    fn set_phase(&mut self, phase: FlightPhase) {
        if self.phase == phase {
            return;
        }
        self.phase = phase;
        info!("PHASE -> {:?}", phase);
        // No receivers is fine; subscription is optional.
        let _ = self.phase_tx.send(phase);
    }

    /// One control-loop step. Not-connected or no-telemetry ticks do
    /// nothing at all.
    fn tick(&mut self) {
        if !self.conn.is_connected() {
            return;
        }
        let Some(snap) = self.conn.latest_snapshot() else {
            return;
        };

        match self.phase {
            FlightPhase::Idle => {}

            FlightPhase::Taxi => self.tick_taxi(&snap),

            FlightPhase::Takeoff => {
                if snap.on_ground {
                    // Make sure the latch is released before the roll.
                    if snap.parking_brake_on {
                        self.dispatcher.set_parking_brake(false);
                    }
                    self.dispatcher.set_throttle_percent(TAKEOFF_THROTTLE_PCT);
                } else {
                    self.set_phase(FlightPhase::Climb);
                }
            }

            FlightPhase::Climb => {
                let err = self.target_alt_ft - snap.altitude_ft;
                self.dispatcher.set_throttle_percent(suggest_throttle(err) as f64);
                if err.abs() < CRUISE_CAPTURE_FT {
                    self.set_phase(FlightPhase::Cruise);
                }
            }

            FlightPhase::Cruise => {
                let err = self.target_alt_ft - snap.altitude_ft;
                self.dispatcher.set_throttle_percent(suggest_throttle(err) as f64);
            }

            // Extension points, no transition logic yet.
            FlightPhase::Descent
            | FlightPhase::Approach
            | FlightPhase::Landing
            | FlightPhase::TaxiIn
            | FlightPhase::Park => {}
        }
    }

    fn tick_taxi(&mut self, snap: &TelemetrySnapshot) {
        if !snap.on_ground {
            self.set_phase(FlightPhase::Takeoff);
            return;
        }

        let hold_short = self.hold_short.load(Ordering::SeqCst);

        // Not holding short: release the parking brake first and let the
        // release register before any throttle or brake command.
        if !hold_short && snap.parking_brake_on {
            self.dispatcher.set_parking_brake(false);
            return;
        }

        if hold_short {
            self.dispatcher.set_throttle_percent(0.0);
            self.dispatcher.set_parking_brake(true);
            self.dispatcher.apply_brakes();
            return;
        }

        let gs = snap.ground_speed_kts;

        // Essentially stopped for more than 2 s: keep throttle at idle.
        if gs < TAXI_STOPPED_KTS {
            let since = *self.stopped_since.get_or_insert_with(Instant::now);
            if since.elapsed() > TAXI_STOPPED_AFTER {
                self.dispatcher.set_throttle_percent(0.0);
                return;
            }
        } else {
            self.stopped_since = None;
        }

        if gs > self.taxi_speed_max_kts + TAXI_OVERSPEED_MARGIN_KTS {
            self.dispatcher.set_throttle_percent(0.0);
            self.dispatcher.apply_brakes();
        } else {
            self.dispatcher.set_throttle_percent(TAXI_THROTTLE_PCT);
        }
    }
}

/// Drives the aircraft through taxi, takeoff roll, climb and cruise on a
/// fixed 5 Hz tick. Reads the latest telemetry snapshot each tick and
/// issues commands through the (shared) dispatcher.
pub struct FlightController {
    engine: Arc<Mutex<PhaseEngine>>,
    hold_short: Arc<AtomicBool>,
    phase_tx: broadcast::Sender<FlightPhase>,
    running: Arc<AtomicBool>,
    loop_task: Mutex<Option<JoinHandle<()>>>,
}

impl FlightController {
    pub fn new(
        conn: Arc<dyn SimConnection>,
        dispatcher: Arc<CommandDispatcher>,
        cfg: &PilotConfig,
    ) -> Self {
        let (phase_tx, _) = broadcast::channel(16);
        let hold_short = Arc::new(AtomicBool::new(cfg.hold_short));

        info!(
            "controller init: target_alt={} ft, taxi_max={} kt",
            cfg.target_altitude_feet, cfg.taxi_speed_kts_max
        );

        let engine = PhaseEngine {
            conn,
            dispatcher,
            target_alt_ft: cfg.target_altitude_feet as f64,
            taxi_speed_max_kts: cfg.taxi_speed_kts_max as f64,
            hold_short: hold_short.clone(),
            phase: FlightPhase::Idle,
            stopped_since: None,
            phase_tx: phase_tx.clone(),
        };

        Self {
            engine: Arc::new(Mutex::new(engine)),
            hold_short,
            phase_tx,
            running: Arc::new(AtomicBool::new(false)),
            loop_task: Mutex::new(None),
        }
    }

    /// Idle -> Taxi and begin ticking. A second call without an intervening
    /// `stop` does nothing. Must run inside a tokio runtime.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        {
            let mut engine = self.engine.lock().unwrap();
            engine.stopped_since = None;
            engine.set_phase(FlightPhase::Taxi);
        }

        let engine = self.engine.clone();
        let running = self.running.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                // One tick at a time; the lock also serializes against
                // lifecycle calls.
                engine.lock().unwrap().tick();
            }
        });
        *self.loop_task.lock().unwrap() = Some(task);
    }

    /// Halt ticking and reset to Idle. The phase change is synchronous with
    /// this call; the loop task stops at its next boundary.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.loop_task.lock().unwrap().take() {
            task.abort();
        }
        let mut engine = self.engine.lock().unwrap();
        engine.stopped_since = None;
        engine.set_phase(FlightPhase::Idle);
    }

    pub fn current_phase(&self) -> FlightPhase {
        self.engine.lock().unwrap().phase
    }

    /// One event per phase transition, carrying the new phase.
    pub fn subscribe_phase_changes(&self) -> broadcast::Receiver<FlightPhase> {
        self.phase_tx.subscribe()
    }

    pub fn set_hold_short(&self, hold: bool) {
        self.hold_short.store(hold, Ordering::SeqCst);
    }

    pub fn hold_short(&self) -> bool {
        self.hold_short.load(Ordering::SeqCst)
    }
}
