use crate::telemetry::TelemetrySnapshot;

/// Narrow interface to the simulator link. Telemetry acquisition, transport
/// and reconnection all live behind this trait; the core never sees
/// simulator-specific event identifiers.
///
/// Axis values are in the sink's native range: 0..=16383 for unipolar
/// channels, -16383..=16383 for bipolar ones. The `CommandDispatcher` is the
/// only caller and computes them from percentages.
pub trait SimConnection: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Most recently published sample, however old. `None` until the first
    /// sample arrives.
    fn latest_snapshot(&self) -> Option<TelemetrySnapshot>;

    fn set_throttle_axis(&self, axis: i32);
    fn toggle_gear(&self);
    /// Momentary wheel-brake application.
    fn apply_brakes(&self);
    fn set_toe_brakes_axis(&self, left: i32, right: i32);
    fn set_rudder_axis(&self, axis: i32);
    fn set_tiller_axis(&self, axis: i32);
    fn toggle_parking_brake(&self);
    fn set_parking_brake(&self, engage: bool);
}
