/// Folds a degree value that landed on the upper bound back to zero.
fn wrap_full_turn(angle_deg: f64) -> f64 {
    let angle_deg = if angle_deg < 0.0 {
        angle_deg + 360.0
    } else {
        angle_deg
    };
    if angle_deg >= 360.0 {
        angle_deg - 360.0
    } else {
        angle_deg
    }
}

/// Bearing in `[0, 360)` from the arm base to `(x, y)`.
///
/// Two branches on `|y| > |x|`: the steep branch measures from the `y` axis
/// (`atan2(x, y)` shifted by -45° and back), the shallow branch from the
/// negative `x` axis (`atan2(y, x) - 180°`). The branch decides which axis the
/// gripper lines up with first.
pub fn bearing(x: f64, y: f64) -> f64 {
    let angle_deg = if y.abs() > x.abs() {
        let angle_rad = x.atan2(y) - std::f64::consts::FRAC_PI_4;
        angle_rad.to_degrees() + 45.0
    } else {
        let angle_rad = y.atan2(x) - std::f64::consts::PI;
        angle_rad.to_degrees()
    };
    wrap_full_turn(angle_deg)
}

/// Bearing used at drop-off: always within `[0, 90]` since it works on the
/// absolute offsets from the base.
pub fn drop_bearing(x: f64, y: f64) -> f64 {
    y.abs().atan2(x.abs()).to_degrees()
}
