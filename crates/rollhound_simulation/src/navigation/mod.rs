//! Path following on top of an external navigation backend.
//!
//! Pathfinding itself lives outside this crate (navmesh, engine agent, ...).
//! The rollhound only decides *when* to ask for a route, pushes its real
//! (physics-driven) position into the backend every tick, and reads back the
//! desired movement direction and a lookahead point for the jump policy.

use bevy::prelude::*;
use std::sync::Arc;

use crate::components::{DesiredDirection, Rollhound};
use crate::config::RollhoundConfig;
use crate::network::NetworkRole;
use crate::targeting::TargetLock;

/// Navigation collaborator consumed by [`PathFollower`].
pub trait NavigationBackend: Send + Sync + 'static {
    /// Sync the backend's idea of the agent position with the rigid body.
    fn set_position(&mut self, position: Vec3);

    /// Request a route to `target`.
    fn move_to(&mut self, target: Vec3);

    /// Drop the current route; desired direction collapses to zero.
    fn stop(&mut self);

    /// Per-tick steering output (any length, zero when idle).
    fn desired_direction(&self) -> Vec3;

    /// Point `distance` ahead along the planned route.
    fn lookahead_point(&self, distance: f32) -> Vec3;

    /// Fresh backend agent on the same navigation data (no route).
    fn fork(&self) -> Box<dyn NavigationBackend>;
}

/// Компонент: handle на навигационного агента (инжектится при спавне)
#[derive(Component)]
pub struct NavAgent(pub Box<dyn NavigationBackend>);

impl NavAgent {
    pub fn new(backend: impl NavigationBackend) -> Self {
        Self(Box::new(backend))
    }
}

impl std::fmt::Debug for NavAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavAgent")
            .field("desired_direction", &self.0.desired_direction())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RouteState {
    /// Ни разу не запрашивали маршрут
    #[default]
    None,
    Following,
    /// Stop уже отправлен, повторно не шлём
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathRequest {
    MoveTo(Vec3),
    Stop,
}

/// Route refresh bookkeeping (the path itself belongs to the backend)
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct PathFollower {
    pub route: RouteState,
    /// Seconds since the last `move_to`
    pub since_request: f32,
}

impl PathFollower {
    pub fn tick(&mut self, delta: f32) {
        self.since_request += delta;
    }

    /// Decide which request (if any) this tick needs.
    pub fn plan(&mut self, target: Option<Vec3>, interval: f32) -> Option<PathRequest> {
        match target {
            Some(position) => {
                let has_route = self.route == RouteState::Following;
                if has_route && self.since_request <= interval {
                    return None;
                }
                self.route = RouteState::Following;
                self.since_request = 0.0;
                Some(PathRequest::MoveTo(position))
            }
            None => {
                if self.route == RouteState::Stopped {
                    return None;
                }
                self.route = RouteState::Stopped;
                Some(PathRequest::Stop)
            }
        }
    }

    pub fn refresh_if_stale(
        &mut self,
        target: Option<Vec3>,
        interval: f32,
        backend: &mut dyn NavigationBackend,
    ) -> Option<PathRequest> {
        let request = self.plan(target, interval)?;
        match request {
            PathRequest::MoveTo(position) => backend.move_to(position),
            PathRequest::Stop => backend.stop(),
        }
        Some(request)
    }
}

/// System: position sync + route refresh + desired direction (authority only)
pub fn follow_paths(
    mut agents: Query<
        (
            &Transform,
            &RollhoundConfig,
            &NetworkRole,
            &TargetLock,
            &mut PathFollower,
            &mut NavAgent,
            &mut DesiredDirection,
        ),
        With<Rollhound>,
    >,
    targets: Query<&Transform, Without<Rollhound>>,
) {
    for (transform, config, role, lock, mut follower, mut nav, mut desired) in agents.iter_mut() {
        if !role.is_authority() {
            continue;
        }

        let backend = nav.0.as_mut();
        // Rigid body — источник истины для позиции
        backend.set_position(transform.translation);

        let target_position = lock
            .target
            .and_then(|target| targets.get(target).ok())
            .map(|target| target.translation);

        follower.refresh_if_stale(target_position, config.path_update_interval, backend);

        let next = DesiredDirection::from_velocity(backend.desired_direction());
        if *desired != next {
            *desired = next;
        }
    }
}

/// Height of the ground at an XZ point.
pub type TerrainSampler = Arc<dyn Fn(Vec2) -> f32 + Send + Sync>;

/// Navmesh-free backend: straight line to the destination.
///
/// Used by the headless runner and tests. With a terrain sampler the
/// lookahead point follows the ground so slopes ahead trigger jumps.
#[derive(Clone)]
pub struct DirectNavigator {
    position: Vec3,
    destination: Option<Vec3>,
    arrive_radius: f32,
    terrain: Option<TerrainSampler>,
}

impl Default for DirectNavigator {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            destination: None,
            arrive_radius: 0.1,
            terrain: None,
        }
    }
}

impl DirectNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_terrain(mut self, terrain: TerrainSampler) -> Self {
        self.terrain = Some(terrain);
        self
    }

    pub fn destination(&self) -> Option<Vec3> {
        self.destination
    }

    fn ground(&self, point: Vec3) -> f32 {
        self.terrain
            .as_ref()
            .map(|height| height(Vec2::new(point.x, point.z)))
            .unwrap_or(0.0)
    }
}

impl NavigationBackend for DirectNavigator {
    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn move_to(&mut self, target: Vec3) {
        self.destination = Some(target);
    }

    fn stop(&mut self) {
        self.destination = None;
    }

    fn desired_direction(&self) -> Vec3 {
        let Some(destination) = self.destination else {
            return Vec3::ZERO;
        };
        let offset = Vec3::new(
            destination.x - self.position.x,
            0.0,
            destination.z - self.position.z,
        );
        if offset.length_squared() <= self.arrive_radius * self.arrive_radius {
            return Vec3::ZERO;
        }
        offset.normalize_or_zero()
    }

    fn lookahead_point(&self, distance: f32) -> Vec3 {
        let direction = self.desired_direction();
        let mut ahead = self.position + direction * distance;
        ahead.y = self.position.y + self.ground(ahead) - self.ground(self.position);
        ahead
    }

    fn fork(&self) -> Box<dyn NavigationBackend> {
        Box::new(Self {
            destination: None,
            ..self.clone()
        })
    }
}
