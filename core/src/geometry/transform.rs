/// Arm workspace bounds the unit detector square maps onto.
pub const ARM_X_RANGE: (f64, f64) = (15.0, 22.0);
pub const ARM_Y_RANGE: (f64, f64) = (10.0, -10.0);

/// Affine map from normalized detector space to the arm workspace:
/// `x' = x * (22 - 15) + 15`, `y' = y * (-10 - 10) + 10`.
///
/// Detector `y` grows down the belt while arm `y` grows to the left, hence
/// the reversed range.
pub fn frame_to_arm(x: f64, y: f64) -> (f64, f64) {
    let (x_lo, x_hi) = ARM_X_RANGE;
    let (y_lo, y_hi) = ARM_Y_RANGE;
    (x * (x_hi - x_lo) + x_lo, y * (y_hi - y_lo) + y_lo)
}

/// Normalizes a measured skew into the signed correction applied at pickup.
///
/// Below one degree the part counts as aligned; anything past vertical is
/// folded back by a half turn.
pub fn skew_to_pickup_offset(angle_deg: f64) -> f64 {
    if angle_deg.abs() < 1.0 {
        0.0
    } else if angle_deg > 90.0 {
        angle_deg - 180.0
    } else {
        angle_deg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_corners_map_to_workspace_corners() {
        assert_eq!(frame_to_arm(0.0, 0.0), (15.0, 10.0));
        assert_eq!(frame_to_arm(1.0, 1.0), (22.0, -10.0));
        assert_eq!(frame_to_arm(0.5, 0.5), (18.5, 0.0));
    }

    #[test]
    fn skew_offset_matches_reference_points() {
        assert_eq!(skew_to_pickup_offset(0.5), 0.0);
        assert_eq!(skew_to_pickup_offset(-0.5), 0.0);
        assert_eq!(skew_to_pickup_offset(91.0), -89.0);
        assert_eq!(skew_to_pickup_offset(45.0), 45.0);
        assert_eq!(skew_to_pickup_offset(-30.0), -30.0);
    }

    #[test]
    fn skew_offset_is_idempotent_on_normalized_input() {
        for angle in [-89.0, -12.5, 0.0, 1.0, 45.0, 90.0, 91.0, 179.0] {
            let once = skew_to_pickup_offset(angle);
            assert_eq!(skew_to_pickup_offset(once), once);
        }
    }
}
