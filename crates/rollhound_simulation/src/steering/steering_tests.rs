//! Tests for torque steering.

use super::*;
use std::f32::consts::PI;

fn close(a: f32, b: f32, tolerance: f32) -> bool {
    (a - b).abs() <= tolerance
}

fn heading(angle: f32) -> Vec3 {
    Vec3::new(angle.cos(), 0.0, angle.sin())
}

#[test]
fn test_rolling_axis_for_plus_x() {
    let axis = rolling_axis(Vec3::X);
    assert!((axis - Vec3::NEG_Z).length() < 1e-6, "axis = {:?}", axis);
}

#[test]
fn test_primary_torque_from_rest() {
    let config = RollhoundConfig {
        base_torque: 20_000_000.0,
        ..default()
    };

    let output = steer(Vec3::X, Vec3::ZERO, false, &config);

    let expected = 20_000_000.0 * 0.6;
    let magnitude = output.primary_torque.length();
    assert!(
        close(magnitude, expected, expected * 1e-6),
        "magnitude = {}",
        magnitude
    );
    assert!(close(output.primary_torque.normalize().z, -1.0, 1e-6));
    assert_eq!(output.correction_torque, Vec3::ZERO);
    assert_eq!(output.assist_force, Vec3::ZERO);
}

#[test]
fn test_vertical_component_ignored() {
    let config = RollhoundConfig::default();
    let flat = steer(Vec3::X, Vec3::ZERO, false, &config);
    let tilted = steer(Vec3::new(1.0, 5.0, 0.0), Vec3::ZERO, false, &config);
    assert_eq!(flat, tilted);
}

#[test]
fn test_aligned_velocity_has_no_correction() {
    let magnitude = correction_magnitude(Vec3::X, Vec3::X * 12.0);
    assert!(close(magnitude, 0.0, 1e-5), "magnitude = {}", magnitude);
}

#[test]
fn test_opposite_velocity_has_no_correction() {
    // sin(π) = 0: летим строго назад — корректировать нечем
    let magnitude = correction_magnitude(Vec3::X, Vec3::NEG_X * 12.0);
    assert!(close(magnitude, 0.0, 1e-4), "magnitude = {}", magnitude);
}

#[test]
fn test_perpendicular_velocity_full_correction() {
    // Desired +X, drifting +Z → correction -|v|
    let magnitude = correction_magnitude(Vec3::X, Vec3::Z * 4.0);
    assert!(close(magnitude, -4.0, 1e-5), "magnitude = {}", magnitude);
}

#[test]
fn test_correction_pushes_against_drift() {
    let config = RollhoundConfig::default();
    let output = steer(Vec3::X, Vec3::Z * 4.0, false, &config);

    // Spin about the correction torque axis moves the ball along ω × up
    let induced = output.correction_torque.cross(Vec3::Y);
    assert!(induced.z < 0.0, "induced = {:?}", induced);
}

#[test]
fn test_heading_difference_is_not_wrapped() {
    let direction = heading(170f32.to_radians());
    let velocity = heading(-170f32.to_radians());

    let raw = heading_difference(direction, velocity);
    assert!(close(raw, 340f32.to_radians(), 1e-4), "raw = {}", raw);
}

#[test]
fn test_unwrapped_difference_matches_wrapped_sine() {
    // Literal atan2 difference beyond ±π gives the same correction as the
    // wrapped angle (-20°) because only sin() is used.
    let direction = heading(170f32.to_radians());
    let velocity = heading(-170f32.to_radians()) * 3.0;

    let magnitude = correction_magnitude(direction, velocity);
    let wrapped = 3.0 * (-20f32).to_radians().sin();
    assert!(close(magnitude, wrapped, 1e-4), "{} vs {}", magnitude, wrapped);
}

#[test]
fn test_unwrapped_difference_near_pi_keeps_sign() {
    for degrees in [-179.0f32, -135.0, -90.0, 0.0, 90.0, 135.0, 179.0] {
        let direction = heading(degrees.to_radians());
        let velocity = heading((degrees + 90.0).to_radians());

        // Velocity 90° ahead of direction in heading → sin(-90°) everywhere
        let magnitude = correction_magnitude(direction, velocity);
        assert!(close(magnitude, -1.0, 1e-4), "{}°: {}", degrees, magnitude);
    }
}

#[test]
fn test_assist_force_only_inside_window() {
    let config = RollhoundConfig::default();

    let airborne = steer(Vec3::Z, Vec3::ZERO, true, &config);
    assert_eq!(airborne.assist_force, Vec3::Z * config.leap_force);

    let grounded = steer(Vec3::Z, Vec3::ZERO, false, &config);
    assert_eq!(grounded.assist_force, Vec3::ZERO);
}

#[test]
fn test_idle_direction_produces_nothing() {
    let config = RollhoundConfig::default();
    let output = steer(Vec3::ZERO, Vec3::X * 3.0, true, &config);
    assert_eq!(output.torque(), Vec3::ZERO);
    assert_eq!(output.assist_force, Vec3::ZERO);
}

#[test]
fn test_half_turn_correction_is_zero() {
    assert!(close(PI.sin(), 0.0, 1e-6));
}
