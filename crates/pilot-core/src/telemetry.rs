/// One immutable sample of vehicle state, published by the connection at
/// its own cadence and replaced wholesale. The controller clones the
/// latest sample out on each tick and never mutates it.
#[derive(Debug, Clone, Default)]
pub struct TelemetrySnapshot {
    pub title: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    /// Feet MSL.
    pub altitude_ft: f64,
    pub indicated_airspeed_kts: f64,
    pub heading_mag_deg: f64,
    pub on_ground: bool,
    pub ground_speed_kts: f64,
    pub parking_brake_on: bool,
    /// 0..100.
    pub brake_left_pct: f64,
    /// 0..100.
    pub brake_right_pct: f64,
    pub engine1_combustion: bool,
    pub engine1_rpm: f64,
}
