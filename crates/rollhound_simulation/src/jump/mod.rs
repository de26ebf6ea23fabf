//! Stochastic jump policy driven by terrain slope ahead.
//!
//! Two independent timers:
//! - `since_attempt` gates the dice roll (every `jump_interval`, jittered);
//! - `since_jump` drives the leap-assist window used by steering.
//!
//! Only the authority rolls the dice. The jump itself is a broadcast impulse,
//! so observers see the same hop and open the same assist window on receipt.

use bevy::prelude::*;
use rand::Rng;

use crate::components::Rollhound;
use crate::config::RollhoundConfig;
use crate::navigation::NavAgent;
use crate::network::{NetworkId, NetworkLink, NetworkRole, ReplicatedEffect};
use crate::DeterministicRng;

/// slope 0.2 (≈11.5°) already means a guaranteed jump
pub const SLOPE_GAIN: f32 = 5.0;

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct JumpPolicy {
    /// Seconds since the last jump (∞ until the first one)
    pub since_jump: f32,
    /// Seconds since the last attempt; may start negative after jitter
    pub since_attempt: f32,
}

impl Default for JumpPolicy {
    fn default() -> Self {
        Self {
            since_jump: f32::INFINITY,
            since_attempt: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JumpDecision {
    /// Attempt timer has not run out yet
    NotDue,
    /// Lookahead was degenerate; retried next tick
    Skipped,
    /// Dice rolled, stayed on the ground
    Stayed { chance: f32 },
    Jumped { chance: f32 },
}

/// Event: authority decided to jump (broadcast already queued)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct JumpIssued {
    pub agent: Entity,
    pub chance: f32,
}

impl JumpPolicy {
    pub fn tick(&mut self, delta: f32) {
        self.since_jump += delta;
        self.since_attempt += delta;
    }

    pub fn mark_jumped(&mut self) {
        self.since_jump = 0.0;
    }

    pub fn assist_active(&self, window: f32) -> bool {
        self.since_jump < window
    }

    /// One attempt check. Draws from `rng` only when the attempt actually
    /// happens: first the jump sample, then the timer jitter.
    pub fn attempt(
        &mut self,
        position: Vec3,
        lookahead: Vec3,
        config: &RollhoundConfig,
        rng: &mut impl Rng,
    ) -> JumpDecision {
        if self.since_attempt <= config.jump_interval {
            return JumpDecision::NotDue;
        }

        let Some(slope) = terrain_slope(position, lookahead) else {
            return JumpDecision::Skipped;
        };

        let chance = jump_chance(slope);
        let sample: f32 = rng.gen();
        let jumped = sample < chance;

        let jitter = attempt_jitter(config);
        self.since_attempt = rng.gen_range(-jitter..=jitter);

        if jumped {
            self.mark_jumped();
            JumpDecision::Jumped { chance }
        } else {
            JumpDecision::Stayed { chance }
        }
    }
}

/// Vertical component of the unit vector toward `lookahead`.
///
/// `None` for a zero-length or non-finite offset.
pub fn terrain_slope(position: Vec3, lookahead: Vec3) -> Option<f32> {
    (lookahead - position).try_normalize().map(|dir| dir.dot(Vec3::Y))
}

/// Jitter half-width; a config that skipped `validate()` must not panic here.
fn attempt_jitter(config: &RollhoundConfig) -> f32 {
    let jitter = config.jump_attempt_jitter;
    if jitter.is_finite() {
        jitter.abs()
    } else {
        0.0
    }
}

pub fn jump_chance(slope: f32) -> f32 {
    (SLOPE_GAIN * slope).clamp(0.0, 1.0)
}

/// System: jump attempts (authority only)
pub fn evaluate_jumps(
    mut agents: Query<
        (
            Entity,
            &Transform,
            &RollhoundConfig,
            &NetworkRole,
            &NetworkId,
            &NavAgent,
            &mut JumpPolicy,
        ),
        With<Rollhound>,
    >,
    mut rng: ResMut<DeterministicRng>,
    mut link: ResMut<NetworkLink>,
    mut issued: EventWriter<JumpIssued>,
) {
    for (agent, transform, config, role, id, nav, mut jump) in agents.iter_mut() {
        if !role.is_authority() {
            continue;
        }

        let position = transform.translation;
        let lookahead = nav.0.lookahead_point(config.lookahead_distance);

        let decision = jump.attempt(position, lookahead, config, &mut rng.rng);
        let JumpDecision::Jumped { chance } = decision else {
            continue;
        };

        link.broadcast(
            *id,
            ReplicatedEffect::Jump {
                impulse: Vec3::Y * config.jump_force,
            },
        );
        issued.write(JumpIssued { agent, chance });
        crate::logger::log(&format!(
            "Rollhound {:?}: jump (chance {:.2})",
            agent, chance
        ));
    }
}
