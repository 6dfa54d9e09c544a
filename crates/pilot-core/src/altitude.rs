/// Step altitude-hold law. Maps altitude error (target minus current, feet;
/// positive means below target) to a throttle percentage. Intentionally a
/// coarse step table rather than a PID; the bands are evaluated top to
/// bottom with strict comparisons and the first match wins.
pub fn suggest_throttle(altitude_error_ft: f64) -> u8 {
    if altitude_error_ft > 1000.0 {
        return 90;
    }
    if altitude_error_ft > 500.0 {
        return 80;
    }
    if altitude_error_ft > 200.0 {
        return 65;
    }

    if altitude_error_ft < -800.0 {
        return 15;
    }
    if altitude_error_ft < -300.0 {
        return 20;
    }
    if altitude_error_ft < -150.0 {
        return 30;
    }

    45 // near target
}
