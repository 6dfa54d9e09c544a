//! Offline stand-in for the simulator link: a longitudinal point-mass
//! aircraft just detailed enough to exercise the taxi / takeoff / climb /
//! cruise loop. The caller steps the model explicitly; telemetry is built
//! from the model state under one lock, so snapshots are always whole.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use pilot_core::connection::SimConnection;
use pilot_core::telemetry::TelemetrySnapshot;
use serde::Deserialize;
use tracing::{debug, info};

const AXIS_MAX: f64 = 16383.0;

// Point-mass tuning, in knots per second of ground-speed change.
const THRUST_ACCEL_KTS_S: f64 = 20.0;
const ROLLING_DRAG_KTS_S: f64 = 0.4;
const ROLLING_DRAG_PER_KT: f64 = 0.08;
const PARK_BRAKE_DECEL_KTS_S: f64 = 25.0;
const BRAKE_TAP_DECEL_KTS_S: f64 = 12.0;
const TOE_BRAKE_DECEL_KTS_S: f64 = 10.0;
const BRAKE_TAP_DECAY_PER_S: f64 = 3.0;

// Airborne behavior: vertical speed scales with throttle around the trim
// point the altitude law settles at.
const TRIM_THROTTLE: f64 = 0.45;
const CLIMB_RATE_FPM_FULL: f64 = 3000.0;
const AIRSPEED_BASE_KTS: f64 = 70.0;
const AIRSPEED_PER_THROTTLE_KTS: f64 = 40.0;

const IDLE_RPM: f64 = 700.0;
const RPM_PER_THROTTLE: f64 = 1900.0;

#[derive(Debug, Clone, Deserialize)]
pub struct SimAircraftConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_latitude_deg")]
    pub latitude_deg: f64,
    #[serde(default = "default_longitude_deg")]
    pub longitude_deg: f64,
    #[serde(default = "default_field_elevation_ft")]
    pub field_elevation_ft: f64,
    /// Indicated airspeed at which the model leaves the ground on its own.
    #[serde(default = "default_rotate_speed_kts")]
    pub rotate_speed_kts: f64,
}

fn default_title() -> String {
    "Pointmass Trainer".into()
}

fn default_latitude_deg() -> f64 {
    47.4647
}

fn default_longitude_deg() -> f64 {
    8.5492
}

fn default_field_elevation_ft() -> f64 {
    1416.0
}

fn default_rotate_speed_kts() -> f64 {
    55.0
}

impl Default for SimAircraftConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            latitude_deg: default_latitude_deg(),
            longitude_deg: default_longitude_deg(),
            field_elevation_ft: default_field_elevation_ft(),
            rotate_speed_kts: default_rotate_speed_kts(),
        }
    }
}

#[derive(Debug)]
struct ModelState {
    throttle: f64, // 0..1, commanded axis fraction
    rudder: f64,   // -1..1
    tiller: f64,
    toe_left: f64,
    toe_right: f64,
    brake_tap: f64, // decaying momentary application, 0..1
    parking_brake: bool,
    gear_down: bool,
    on_ground: bool,
    altitude_ft: f64,
    ground_speed_kts: f64,
    airspeed_kts: f64,
    heading_deg: f64,
}

pub struct SimulatedAircraft {
    cfg: SimAircraftConfig,
    connected: AtomicBool,
    model: Mutex<ModelState>,
}

impl SimulatedAircraft {
    /// Parked at the ramp with the parking brake set and the engine running.
    pub fn new(cfg: SimAircraftConfig) -> Self {
        let model = ModelState {
            throttle: 0.0,
            rudder: 0.0,
            tiller: 0.0,
            toe_left: 0.0,
            toe_right: 0.0,
            brake_tap: 0.0,
            parking_brake: true,
            gear_down: true,
            on_ground: true,
            altitude_ft: cfg.field_elevation_ft,
            ground_speed_kts: 0.0,
            airspeed_kts: 0.0,
            heading_deg: 140.0,
        };
        info!("sim: {} parked at {:.0} ft", cfg.title, cfg.field_elevation_ft);
        Self {
            cfg,
            connected: AtomicBool::new(true),
            model: Mutex::new(model),
        }
    }

    /// Advance the model by `dt_s` seconds.
    pub fn step(&self, dt_s: f64) {
        let mut m = self.model.lock().unwrap();

        if m.on_ground {
            let thrust = THRUST_ACCEL_KTS_S * m.throttle;
            let rolling = ROLLING_DRAG_KTS_S + ROLLING_DRAG_PER_KT * m.ground_speed_kts;
            let mut braking = BRAKE_TAP_DECEL_KTS_S * m.brake_tap
                + TOE_BRAKE_DECEL_KTS_S * (m.toe_left + m.toe_right) / 2.0;
            if m.parking_brake {
                braking += PARK_BRAKE_DECEL_KTS_S;
            }
            m.ground_speed_kts =
                (m.ground_speed_kts + (thrust - rolling - braking) * dt_s).max(0.0);
            m.airspeed_kts = m.ground_speed_kts;
            m.altitude_ft = self.cfg.field_elevation_ft;

            let steer = m.rudder + m.tiller;
            if m.ground_speed_kts > 1.0 && steer.abs() > 0.0 {
                let authority = (m.ground_speed_kts / 10.0).min(1.0);
                m.heading_deg =
                    (m.heading_deg + steer * 20.0 * authority * dt_s).rem_euclid(360.0);
            }

            if m.airspeed_kts >= self.cfg.rotate_speed_kts {
                m.on_ground = false;
                info!("sim: rotated at {:.0} kt", m.airspeed_kts);
            }
        } else {
            let vs_fpm = (m.throttle - TRIM_THROTTLE) * CLIMB_RATE_FPM_FULL;
            m.altitude_ft = (m.altitude_ft + vs_fpm * dt_s / 60.0)
                .max(self.cfg.field_elevation_ft);
            m.airspeed_kts = AIRSPEED_BASE_KTS + AIRSPEED_PER_THROTTLE_KTS * m.throttle;
            m.ground_speed_kts = m.airspeed_kts;
        }

        m.brake_tap = (m.brake_tap - BRAKE_TAP_DECAY_PER_S * m.brake_tap * dt_s).max(0.0);
    }

    /// Scenario hook: put the aircraft in the air, the handoff the reference
    /// operator performed by hand. Used by demos and end-to-end tests.
    pub fn lift_off(&self) {
        let mut m = self.model.lock().unwrap();
        if !m.on_ground {
            return;
        }
        m.on_ground = false;
        m.airspeed_kts = m.airspeed_kts.max(self.cfg.rotate_speed_kts);
        m.ground_speed_kts = m.airspeed_kts;
        info!("sim: lift-off forced at {:.0} kt", m.airspeed_kts);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl SimConnection for SimulatedAircraft {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn latest_snapshot(&self) -> Option<TelemetrySnapshot> {
        let m = self.model.lock().unwrap();
        Some(TelemetrySnapshot {
            title: self.cfg.title.clone(),
            latitude_deg: self.cfg.latitude_deg,
            longitude_deg: self.cfg.longitude_deg,
            altitude_ft: m.altitude_ft,
            indicated_airspeed_kts: m.airspeed_kts,
            heading_mag_deg: m.heading_deg,
            on_ground: m.on_ground,
            ground_speed_kts: m.ground_speed_kts,
            parking_brake_on: m.parking_brake,
            brake_left_pct: 100.0 * m.toe_left.max(m.brake_tap),
            brake_right_pct: 100.0 * m.toe_right.max(m.brake_tap),
            engine1_combustion: true,
            engine1_rpm: IDLE_RPM + RPM_PER_THROTTLE * m.throttle,
        })
    }

    fn set_throttle_axis(&self, axis: i32) {
        let mut m = self.model.lock().unwrap();
        m.throttle = (axis as f64 / AXIS_MAX).clamp(0.0, 1.0);
    }

    fn toggle_gear(&self) {
        let mut m = self.model.lock().unwrap();
        m.gear_down = !m.gear_down;
        debug!("sim: gear {}", if m.gear_down { "down" } else { "up" });
    }

    fn apply_brakes(&self) {
        self.model.lock().unwrap().brake_tap = 1.0;
    }

    fn set_toe_brakes_axis(&self, left: i32, right: i32) {
        let mut m = self.model.lock().unwrap();
        m.toe_left = (left as f64 / AXIS_MAX).clamp(0.0, 1.0);
        m.toe_right = (right as f64 / AXIS_MAX).clamp(0.0, 1.0);
    }

    fn set_rudder_axis(&self, axis: i32) {
        self.model.lock().unwrap().rudder = (axis as f64 / AXIS_MAX).clamp(-1.0, 1.0);
    }

    fn set_tiller_axis(&self, axis: i32) {
        self.model.lock().unwrap().tiller = (axis as f64 / AXIS_MAX).clamp(-1.0, 1.0);
    }

    fn toggle_parking_brake(&self) {
        let mut m = self.model.lock().unwrap();
        m.parking_brake = !m.parking_brake;
        debug!("sim: parking brake {}", if m.parking_brake { "set" } else { "released" });
    }

    fn set_parking_brake(&self, engage: bool) {
        self.model.lock().unwrap().parking_brake = engage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airplane() -> SimulatedAircraft {
        SimulatedAircraft::new(SimAircraftConfig::default())
    }

    #[test]
    fn parking_brake_holds_against_full_power() {
        let sim = airplane();
        sim.set_throttle_axis(16383);
        for _ in 0..50 {
            sim.step(0.2);
        }
        let snap = sim.latest_snapshot().unwrap();
        assert!(snap.on_ground);
        assert_eq!(snap.ground_speed_kts, 0.0);
    }

    #[test]
    fn full_power_roll_reaches_rotation() {
        let sim = airplane();
        sim.set_parking_brake(false);
        sim.set_throttle_axis(16383);
        for _ in 0..100 {
            sim.step(0.2);
        }
        let snap = sim.latest_snapshot().unwrap();
        assert!(!snap.on_ground, "should have rotated within 20 s");
        assert!(snap.indicated_airspeed_kts >= 55.0);
    }

    #[test]
    fn trickle_throttle_stays_at_taxi_speed() {
        let sim = airplane();
        sim.set_parking_brake(false);
        sim.set_throttle_axis(819); // 5%
        for _ in 0..300 {
            sim.step(0.2);
        }
        let snap = sim.latest_snapshot().unwrap();
        assert!(snap.on_ground);
        assert!(snap.ground_speed_kts > 0.5);
        assert!(snap.ground_speed_kts < 10.0);
    }

    #[test]
    fn climbs_above_trim_and_descends_below() {
        let sim = airplane();
        sim.lift_off();
        sim.set_throttle_axis(14745); // 90%
        let start = sim.latest_snapshot().unwrap().altitude_ft;
        for _ in 0..50 {
            sim.step(0.2);
        }
        let climbed = sim.latest_snapshot().unwrap().altitude_ft;
        assert!(climbed > start + 100.0);

        sim.set_throttle_axis(3277); // 20%
        for _ in 0..50 {
            sim.step(0.2);
        }
        assert!(sim.latest_snapshot().unwrap().altitude_ft < climbed);
    }

    #[test]
    fn brake_tap_decays() {
        let sim = airplane();
        sim.apply_brakes();
        assert!(sim.latest_snapshot().unwrap().brake_left_pct > 99.0);
        for _ in 0..20 {
            sim.step(0.2);
        }
        assert!(sim.latest_snapshot().unwrap().brake_left_pct < 10.0);
    }
}
