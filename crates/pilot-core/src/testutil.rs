use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::connection::SimConnection;
use crate::telemetry::TelemetrySnapshot;

/// Everything the mock sink was asked to transmit, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Sent {
    Throttle(i32),
    GearToggle,
    Brakes,
    ToeBrakes(i32, i32),
    Rudder(i32),
    Tiller(i32),
    ParkBrakeToggle,
    ParkBrakeSet(bool),
}

#[derive(Default)]
pub(crate) struct MockSim {
    pub connected: AtomicBool,
    pub snapshot: Mutex<Option<TelemetrySnapshot>>,
    sent: Mutex<Vec<Sent>>,
}

impl MockSim {
    pub fn connected() -> Self {
        let sim = Self::default();
        sim.connected.store(true, Ordering::SeqCst);
        sim
    }

    pub fn publish(&self, snap: TelemetrySnapshot) {
        *self.snapshot.lock().unwrap() = Some(snap);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn throttle_sends(&self) -> Vec<i32> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Throttle(axis) => Some(axis),
                _ => None,
            })
            .collect()
    }

    fn record(&self, cmd: Sent) {
        self.sent.lock().unwrap().push(cmd);
    }
}

impl SimConnection for MockSim {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn latest_snapshot(&self) -> Option<TelemetrySnapshot> {
        self.snapshot.lock().unwrap().clone()
    }

    fn set_throttle_axis(&self, axis: i32) {
        self.record(Sent::Throttle(axis));
    }

    fn toggle_gear(&self) {
        self.record(Sent::GearToggle);
    }

    fn apply_brakes(&self) {
        self.record(Sent::Brakes);
    }

    fn set_toe_brakes_axis(&self, left: i32, right: i32) {
        self.record(Sent::ToeBrakes(left, right));
    }

    fn set_rudder_axis(&self, axis: i32) {
        self.record(Sent::Rudder(axis));
    }

    fn set_tiller_axis(&self, axis: i32) {
        self.record(Sent::Tiller(axis));
    }

    fn toggle_parking_brake(&self) {
        self.record(Sent::ParkBrakeToggle);
    }

    fn set_parking_brake(&self, engage: bool) {
        self.record(Sent::ParkBrakeSet(engage));
    }
}

/// Stationary on the ramp, engine running, brake released.
pub(crate) fn ground_snapshot() -> TelemetrySnapshot {
    TelemetrySnapshot {
        title: "Test Prop".into(),
        latitude_deg: 47.4647,
        longitude_deg: 8.5492,
        altitude_ft: 1416.0,
        indicated_airspeed_kts: 0.0,
        heading_mag_deg: 140.0,
        on_ground: true,
        ground_speed_kts: 0.0,
        parking_brake_on: false,
        brake_left_pct: 0.0,
        brake_right_pct: 0.0,
        engine1_combustion: true,
        engine1_rpm: 750.0,
    }
}
