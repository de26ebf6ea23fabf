//! Target selection: nearest eligible player within planar range.
//!
//! The agent never owns its target. [`TargetLock`] keeps an `Entity` handle
//! that is re-validated against the eligibility predicate on every pass; a
//! despawned or untagged target simply stops being eligible.

use bevy::prelude::*;

use crate::components::{Player, PlayerController, Rollhound};
use crate::config::RollhoundConfig;
use crate::network::NetworkRole;

/// Consecutive empty scans between two "no target" warnings (~5 s at 60 Hz)
pub const MISS_WARNING_INTERVAL: u32 = 300;

/// Current target handle + re-targeting timer
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct TargetLock {
    pub target: Option<Entity>,
    /// Seconds since the last assignment
    pub since_assigned: f32,
    /// Reacquisition passes in a row that found nothing
    pub consecutive_misses: u32,
}

impl TargetLock {
    pub fn tick(&mut self, delta: f32) {
        self.since_assigned += delta;
    }

    /// Assign (or clear) the target and restart the timer.
    pub fn assign(&mut self, target: Option<Entity>) {
        self.target = target;
        self.since_assigned = 0.0;
        if target.is_some() {
            self.consecutive_misses = 0;
        } else {
            self.consecutive_misses = self.consecutive_misses.saturating_add(1);
        }
    }
}

/// Snapshot of one scene entity as seen by the selector.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub entity: Entity,
    pub position: Vec3,
    pub is_player: bool,
    pub has_controller: bool,
}

/// Event: target handle changed (acquired, switched or lost)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct TargetChanged {
    pub agent: Entity,
    pub previous: Option<Entity>,
    pub current: Option<Entity>,
}

/// Squared distance on the XZ plane (height is ignored).
pub fn planar_distance_squared(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    dx * dx + dz * dz
}

pub fn is_eligible(origin: Vec3, max_range_squared: f32, candidate: &Candidate) -> bool {
    candidate.is_player
        && candidate.has_controller
        && planar_distance_squared(origin, candidate.position) <= max_range_squared
}

/// Nearest eligible candidate; ties keep the first one encountered.
pub fn select_target(
    origin: Vec3,
    max_range: f32,
    candidates: impl IntoIterator<Item = Candidate>,
) -> Option<Entity> {
    let max_range_squared = max_range * max_range;
    let mut best: Option<(Entity, f32)> = None;

    for candidate in candidates {
        if !is_eligible(origin, max_range_squared, &candidate) {
            continue;
        }

        let distance = planar_distance_squared(origin, candidate.position);
        // Строго меньше: при равенстве остаётся первый
        if best.is_none_or(|(_, best_distance)| distance < best_distance) {
            best = Some((candidate.entity, distance));
        }
    }

    best.map(|(entity, _)| entity)
}

/// Re-evaluate when the timer ran out or the current target is no longer valid.
pub fn should_reacquire(lock: &TargetLock, current_still_eligible: bool, interval: f32) -> bool {
    lock.since_assigned > interval || !current_still_eligible
}

/// System: periodic target reacquisition (authority only)
pub fn reacquire_targets(
    mut agents: Query<
        (Entity, &Transform, &RollhoundConfig, &NetworkRole, &mut TargetLock),
        With<Rollhound>,
    >,
    scene: Query<(Entity, &Transform, Has<Player>, Has<PlayerController>)>,
    mut changes: EventWriter<TargetChanged>,
) {
    let candidate = |(entity, transform, is_player, has_controller): (Entity, &Transform, bool, bool)| {
        Candidate {
            entity,
            position: transform.translation,
            is_player,
            has_controller,
        }
    };

    for (agent, transform, config, role, mut lock) in agents.iter_mut() {
        if !role.is_authority() {
            continue;
        }

        let origin = transform.translation;
        let still_eligible = lock
            .target
            .and_then(|target| scene.get(target).ok())
            .map(candidate)
            .is_some_and(|c| is_eligible(origin, config.max_target_range_squared(), &c));

        if !should_reacquire(&lock, still_eligible, config.target_interval) {
            continue;
        }

        let previous = lock.target;
        let selected = select_target(origin, config.max_target_range, scene.iter().map(candidate));
        lock.assign(selected);

        if previous != selected {
            changes.write(TargetChanged {
                agent,
                previous,
                current: selected,
            });
            match selected {
                Some(target) => crate::logger::log(&format!(
                    "Rollhound {:?}: target acquired {:?}",
                    agent, target
                )),
                None => crate::logger::log(&format!(
                    "Rollhound {:?}: target {:?} lost",
                    agent, previous
                )),
            }
        }

        if lock.consecutive_misses > 0 && lock.consecutive_misses % MISS_WARNING_INTERVAL == 0 {
            crate::logger::log_warning(&format!(
                "Rollhound {:?}: no eligible target for {} scans",
                agent, lock.consecutive_misses
            ));
        }
    }
}
