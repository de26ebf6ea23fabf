//! The rollhound agent marker and its steering input.

use bevy::prelude::*;

use crate::config::RollhoundConfig;
use crate::contact::ContactCooldown;
use crate::jump::JumpPolicy;
use crate::navigation::PathFollower;
use crate::network::NetworkRole;
use crate::targeting::TargetLock;

/// Rollhound — преследующий шар
///
/// Required Components добавляют всё состояние пайплайна; физика (rapier) и
/// навигация (`NavAgent`) вешаются через `spawn_rollhound`.
#[derive(Component, Debug, Clone, Copy, Default)]
#[require(
    RollhoundConfig,
    TargetLock,
    PathFollower,
    JumpPolicy,
    ContactCooldown,
    DesiredDirection,
    NetworkRole
)]
pub struct Rollhound;

/// Horizontal unit vector the agent wants to roll along (zero = idle).
///
/// The authority fills it from the navigation backend every tick; on
/// observers it holds whatever the state sync delivered last.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct DesiredDirection(pub Vec3);

impl DesiredDirection {
    /// Flatten onto the XZ plane and normalize (zero stays zero).
    pub fn from_velocity(velocity: Vec3) -> Self {
        Self(Vec3::new(velocity.x, 0.0, velocity.z).normalize_or_zero())
    }

    pub fn is_idle(&self) -> bool {
        self.0 == Vec3::ZERO
    }
}

/// System: advance every elapsed-time counter by one fixed tick
///
/// Runs on all instances; observers need `JumpPolicy::since_jump` for the
/// leap-assist window.
pub fn advance_rollhound_timers(
    mut agents: Query<
        (&mut TargetLock, &mut PathFollower, &mut JumpPolicy, &mut ContactCooldown),
        With<Rollhound>,
    >,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (mut lock, mut follower, mut jump, mut cooldown) in agents.iter_mut() {
        lock.tick(delta);
        follower.tick(delta);
        jump.tick(delta);
        cooldown.tick(delta);
    }
}
