//! Torque steering for a free-rolling ball.
//!
//! The body is never pushed directly (except during the post-jump leap
//! assist). Rolling toward `direction` means spinning about the horizontal
//! axis perpendicular to it; a second torque about `direction` itself bleeds
//! off sideways velocity so the ball does not orbit its target.
//!
//! Runs on every instance every tick. Observers roll with whatever
//! [`DesiredDirection`] and velocity they currently hold.

use bevy::prelude::*;
use bevy_rapier3d::prelude::{ExternalForce, Velocity};
use std::f32::consts::FRAC_PI_2;

use crate::components::{DesiredDirection, Rollhound};
use crate::config::RollhoundConfig;
use crate::jump::JumpPolicy;

/// Share of `base_torque` used for the primary rolling torque
pub const PRIMARY_TORQUE_SCALE: f32 = 0.6;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringOutput {
    pub primary_torque: Vec3,
    pub correction_torque: Vec3,
    /// Forward force, non-zero only inside the leap-assist window
    pub assist_force: Vec3,
}

impl SteeringOutput {
    pub fn torque(&self) -> Vec3 {
        self.primary_torque + self.correction_torque
    }
}

/// `direction` rotated +90° about +Y: the spin axis that rolls the ball along it.
pub fn rolling_axis(direction: Vec3) -> Vec3 {
    Quat::from_rotation_y(FRAC_PI_2) * direction
}

/// Planar heading of `direction` minus planar heading of `velocity`.
///
/// Not wrapped into (−π, π]: the result spans (−2π, 2π). Only its sine is
/// consumed, and sine is 2π-periodic.
pub fn heading_difference(direction: Vec3, velocity: Vec3) -> f32 {
    direction.z.atan2(direction.x) - velocity.z.atan2(velocity.x)
}

/// `|v_xz| · sin(heading_difference)` — sideways speed relative to `direction`.
pub fn correction_magnitude(direction: Vec3, velocity: Vec3) -> f32 {
    let horizontal = Vec3::new(velocity.x, 0.0, velocity.z);
    horizontal.length() * heading_difference(direction, horizontal).sin()
}

pub fn steer(
    direction: Vec3,
    velocity: Vec3,
    assist_active: bool,
    config: &RollhoundConfig,
) -> SteeringOutput {
    let direction = Vec3::new(direction.x, 0.0, direction.z);

    let primary_torque = rolling_axis(direction) * config.base_torque * PRIMARY_TORQUE_SCALE;
    let correction_torque =
        direction * correction_magnitude(direction, velocity) * config.correction_torque;

    // В воздухе крутящий момент бесполезен — нет сцепления
    let assist_force = if assist_active {
        direction * config.leap_force
    } else {
        Vec3::ZERO
    };

    SteeringOutput {
        primary_torque,
        correction_torque,
        assist_force,
    }
}

/// System: torque/force actuation (every instance, every tick)
pub fn apply_steering(
    mut agents: Query<
        (
            &DesiredDirection,
            &Velocity,
            &RollhoundConfig,
            &JumpPolicy,
            &mut ExternalForce,
        ),
        With<Rollhound>,
    >,
) {
    for (desired, velocity, config, jump, mut external) in agents.iter_mut() {
        let output = steer(
            desired.0,
            velocity.linvel,
            jump.assist_active(config.jump_assist_window),
            config,
        );

        external.torque = output.torque();
        external.force = output.assist_force;
    }
}

#[cfg(test)]
mod steering_tests;
