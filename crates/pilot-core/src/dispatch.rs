use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::connection::SimConnection;

/// Full-scale axis value of the sink.
pub const AXIS_MAX: f64 = 16383.0;

/// A logical actuator line. Each channel carries its own gating policy and
/// its own dispatch record; channels are fully independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Throttle,
    Gear,
    Brakes,
    ToeBrakes,
    Rudder,
    Tiller,
    ParkBrake,
    ParkBrakeSet,
}

/// How a channel decides whether a call reaches the sink.
///
/// `Both` sends only when the rate interval has elapsed AND the value moved
/// by at least `min_delta`. `Either` suppresses only when both conditions
/// fail. `RateOnly` ignores values (toggles and taps). The asymmetry is
/// deliberate and per channel; do not unify.
#[derive(Debug, Clone, Copy)]
pub enum GatePolicy {
    Both { interval: Duration, min_delta: f64 },
    Either { interval: Duration, min_delta: f64 },
    RateOnly { interval: Duration },
}

impl Channel {
    pub fn policy(self) -> GatePolicy {
        use GatePolicy::*;
        match self {
            Channel::Throttle => Both { interval: Duration::from_millis(100), min_delta: 0.5 },
            Channel::Gear => RateOnly { interval: Duration::from_millis(150) },
            Channel::Brakes => RateOnly { interval: Duration::from_millis(150) },
            Channel::ToeBrakes => Either { interval: Duration::from_millis(50), min_delta: 0.5 },
            Channel::Rudder => Either { interval: Duration::from_millis(50), min_delta: 1.0 },
            Channel::Tiller => Either { interval: Duration::from_millis(50), min_delta: 1.0 },
            Channel::ParkBrake => RateOnly { interval: Duration::from_millis(250) },
            Channel::ParkBrakeSet => RateOnly { interval: Duration::from_millis(250) },
        }
    }
}

/// Last successful send on a channel. Multi-valued channels (toe brakes)
/// keep one entry per side; the change gate fires when any side moved.
#[derive(Debug, Default)]
struct DispatchRecord {
    last_sent: Option<Instant>,
    last_values: Option<Vec<f64>>,
}

impl DispatchRecord {
    fn rate_elapsed(&self, now: Instant, interval: Duration) -> bool {
        self.last_sent.map_or(true, |t| now.duration_since(t) >= interval)
    }

    fn value_changed(&self, values: &[f64], min_delta: f64) -> bool {
        match &self.last_values {
            None => true,
            Some(last) if last.len() != values.len() => true,
            Some(last) => last
                .iter()
                .zip(values)
                .any(|(old, new)| (new - old).abs() >= min_delta),
        }
    }
}

/// Rate-limits and de-bounces outbound actuator writes, one record per
/// channel. All values are clamped to their legal range before gating and
/// mapped linearly onto the sink's native axis range. Every operation is a
/// silent no-op while the sink reports not-connected.
///
/// Takes `&self` everywhere so a single instance can be shared between the
/// tick loop and interactive callers; the record registry is locked so both
/// observe consistent last-sent state.
pub struct CommandDispatcher {
    sink: Arc<dyn SimConnection>,
    records: Mutex<HashMap<Channel, DispatchRecord>>,
}

impl CommandDispatcher {
    pub fn new(sink: Arc<dyn SimConnection>) -> Self {
        Self { sink, records: Mutex::new(HashMap::new()) }
    }

    /// Evaluate the channel's gate against `values` and, on pass, commit the
    /// send time and values in the same critical section.
    fn admit(&self, channel: Channel, values: &[f64]) -> bool {
        let now = Instant::now();
        let mut records = self.records.lock().unwrap();
        let rec = records.entry(channel).or_default();

        let pass = match channel.policy() {
            GatePolicy::Both { interval, min_delta } => {
                rec.rate_elapsed(now, interval) && rec.value_changed(values, min_delta)
            }
            GatePolicy::Either { interval, min_delta } => {
                rec.rate_elapsed(now, interval) || rec.value_changed(values, min_delta)
            }
            GatePolicy::RateOnly { interval } => rec.rate_elapsed(now, interval),
        };

        if pass {
            rec.last_sent = Some(now);
            rec.last_values = Some(values.to_vec());
        }
        pass
    }

    /// Throttle 0..100% onto 0..16383.
    pub fn set_throttle_percent(&self, percent: f64) {
        if !self.sink.is_connected() {
            return;
        }
        let pct = percent.clamp(0.0, 100.0);
        if !self.admit(Channel::Throttle, &[pct]) {
            return;
        }
        let axis = to_axis(pct);
        self.sink.set_throttle_axis(axis);
        info!("cmd THROTTLE {:.0}% (axis={})", pct, axis);
    }

    pub fn toggle_gear(&self) {
        if !self.sink.is_connected() {
            return;
        }
        if !self.admit(Channel::Gear, &[]) {
            return;
        }
        self.sink.toggle_gear();
        info!("cmd GEAR_TOGGLE");
    }

    /// Momentary brake tap.
    pub fn apply_brakes(&self) {
        if !self.sink.is_connected() {
            return;
        }
        if !self.admit(Channel::Brakes, &[]) {
            return;
        }
        self.sink.apply_brakes();
        info!("cmd BRAKES");
    }

    /// Continuous-hold variant, meant to be called every tick while a hold
    /// is active. Bypasses the gate entirely.
    pub fn apply_brakes_hold_tick(&self) {
        if !self.sink.is_connected() {
            return;
        }
        self.sink.apply_brakes();
        debug!("cmd BRAKES (hold tick)");
    }

    /// Left/right toe brakes 0..100% onto 0..16383 each.
    pub fn set_toe_brakes_percent(&self, left: f64, right: f64) {
        if !self.sink.is_connected() {
            return;
        }
        let l = left.clamp(0.0, 100.0);
        let r = right.clamp(0.0, 100.0);
        if !self.admit(Channel::ToeBrakes, &[l, r]) {
            return;
        }
        let (la, ra) = (to_axis(l), to_axis(r));
        self.sink.set_toe_brakes_axis(la, ra);
        info!("cmd TOE_BRAKES L={:.0}% R={:.0}% (axes {}/{})", l, r, la, ra);
    }

    /// Rudder -100..+100% onto -16383..+16383.
    pub fn set_rudder_percent(&self, percent: f64) {
        if !self.sink.is_connected() {
            return;
        }
        let pct = percent.clamp(-100.0, 100.0);
        if !self.admit(Channel::Rudder, &[pct]) {
            return;
        }
        let axis = to_axis(pct);
        self.sink.set_rudder_axis(axis);
        info!("cmd RUDDER {:.0}% (axis={})", pct, axis);
    }

    pub fn center_rudder(&self) {
        self.set_rudder_percent(0.0);
    }

    /// Nosewheel tiller -100..+100% onto -16383..+16383.
    pub fn set_tiller_percent(&self, percent: f64) {
        if !self.sink.is_connected() {
            return;
        }
        let pct = percent.clamp(-100.0, 100.0);
        if !self.admit(Channel::Tiller, &[pct]) {
            return;
        }
        let axis = to_axis(pct);
        self.sink.set_tiller_axis(axis);
        info!("cmd TILLER {:.0}% (axis={})", pct, axis);
    }

    pub fn toggle_parking_brake(&self) {
        if !self.sink.is_connected() {
            return;
        }
        if !self.admit(Channel::ParkBrake, &[]) {
            return;
        }
        self.sink.toggle_parking_brake();
        info!("cmd PARKING_BRAKES_TOGGLE");
    }

    pub fn set_parking_brake(&self, engage: bool) {
        if !self.sink.is_connected() {
            return;
        }
        if !self.admit(Channel::ParkBrakeSet, &[]) {
            return;
        }
        self.sink.set_parking_brake(engage);
        info!("cmd PARKING_BRAKES {}", if engage { "SET" } else { "RELEASE" });
    }
}

/// Linear percent-to-native mapping, sign preserved for bipolar channels.
fn to_axis(percent: f64) -> i32 {
    (AXIS_MAX * (percent / 100.0)).round() as i32
}
