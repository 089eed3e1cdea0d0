//! Angle Helpers
//!
//! Degree-based rotation helpers in the host engine's heading convention:
//!
//! - yaw 0 faces +Z, positive yaw turns toward -X
//! - pitch is positive when the nose points down
//!
//! All physics headings are stored in degrees to match the synchronized
//! fields and the persisted record layout.

use glam::DVec3;

/// Wrap an angle into the canonical `[-180, 180)` degree range.
#[inline]
pub fn wrap_degrees(degrees: f32) -> f32 {
    let mut wrapped = degrees % 360.0;
    if wrapped >= 180.0 {
        wrapped -= 360.0;
    }
    if wrapped < -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

/// Unit direction vector for a pitch/yaw pair (degrees).
#[inline]
pub fn direction_from_rotation(pitch: f32, yaw: f32) -> DVec3 {
    let pitch = (pitch as f64).to_radians();
    let yaw = (yaw as f64).to_radians();
    let horizontal = pitch.cos();
    DVec3::new(-yaw.sin() * horizontal, -pitch.sin(), yaw.cos() * horizontal)
}

/// Elevation angle of a vector in degrees (positive when climbing).
#[inline]
pub fn pitch_of(vec: DVec3) -> f32 {
    let horizontal = (vec.x * vec.x + vec.z * vec.z).sqrt();
    vec.y.atan2(horizontal).to_degrees() as f32
}

/// Heading yaw of a vector in degrees, inverse of [`direction_from_rotation`].
#[inline]
pub fn yaw_of(vec: DVec3) -> f32 {
    (-vec.x).atan2(vec.z).to_degrees() as f32
}

/// Linear interpolation between two vectors.
#[inline]
pub fn lerp_vec(from: DVec3, to: DVec3, t: f64) -> DVec3 {
    from + (to - from) * t
}

/// Length of the horizontal (XZ) component.
#[inline]
pub fn horizontal_length(vec: DVec3) -> f64 {
    (vec.x * vec.x + vec.z * vec.z).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_degrees_edges() {
        assert_eq!(wrap_degrees(185.0), -175.0);
        assert_eq!(wrap_degrees(-185.0), 175.0);
        assert_eq!(wrap_degrees(180.0), -180.0);
        assert_eq!(wrap_degrees(-180.0), -180.0);
        assert_eq!(wrap_degrees(0.0), 0.0);
        assert_eq!(wrap_degrees(725.0), 5.0);
    }

    #[test]
    fn test_direction_from_rotation_axes() {
        let forward = direction_from_rotation(0.0, 0.0);
        assert!(forward.abs_diff_eq(DVec3::Z, 1e-9));

        let west = direction_from_rotation(0.0, 90.0);
        assert!(west.abs_diff_eq(DVec3::NEG_X, 1e-9));

        // Positive pitch looks down
        let down = direction_from_rotation(90.0, 0.0);
        assert!(down.abs_diff_eq(DVec3::NEG_Y, 1e-9));
    }

    #[test]
    fn test_pitch_and_yaw_invert_direction() {
        for &(pitch, yaw) in &[(10.0f32, 30.0f32), (-45.0, -120.0), (0.0, 179.0)] {
            let dir = direction_from_rotation(pitch, yaw);
            assert!((yaw_of(dir) - yaw).abs() < 1e-3);
            // pitch_of reports elevation, the opposite sign of heading pitch
            assert!((pitch_of(dir) + pitch).abs() < 1e-3);
        }
    }

    #[test]
    fn test_lerp_half() {
        let v = lerp_vec(DVec3::ZERO, DVec3::new(2.0, -4.0, 6.0), 0.5);
        assert_eq!(v, DVec3::new(1.0, -2.0, 3.0));
    }
}
