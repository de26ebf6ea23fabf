//! Rigid-body seam: spawning rollhound bodies and reading rapier contacts.
//!
//! Rapier integrates the body; the pursuit pipeline only writes
//! `ExternalForce` / `ExternalImpulse` and reads `Velocity`.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::components::Rollhound;
use crate::config::RollhoundConfig;
use crate::contact::AgentContact;
use crate::navigation::{NavAgent, NavigationBackend};
use crate::network::{NetworkId, NetworkRole, Replicated};

/// Радиус шара (метры)
pub const BODY_RADIUS: f32 = 0.5;

/// Everything needed to bring a rollhound body to life.
pub struct RollhoundSpawn {
    pub position: Vec3,
    pub linear_velocity: Vec3,
    pub config: RollhoundConfig,
    pub role: NetworkRole,
    pub id: NetworkId,
    /// Observers usually spawn without a navigation agent
    pub navigator: Option<Box<dyn NavigationBackend>>,
}

impl RollhoundSpawn {
    pub fn authority(position: Vec3, id: NetworkId, navigator: impl NavigationBackend) -> Self {
        Self {
            position,
            linear_velocity: Vec3::ZERO,
            config: RollhoundConfig::default(),
            role: NetworkRole::Authority,
            id,
            navigator: Some(Box::new(navigator)),
        }
    }

    pub fn observer(position: Vec3, id: NetworkId) -> Self {
        Self {
            position,
            linear_velocity: Vec3::ZERO,
            config: RollhoundConfig::default(),
            role: NetworkRole::Observer,
            id,
            navigator: None,
        }
    }
}

/// Spawn helper для rollhound
///
/// Создает entity с полным набором компонентов:
/// - Rollhound (+ required pursuit state)
/// - Transform, NetworkRole, NetworkId, Replicated
/// - Rapier: dynamic ball + force/impulse accumulators + collision events
pub fn spawn_rollhound(commands: &mut Commands, spawn: RollhoundSpawn) -> Entity {
    let RollhoundSpawn {
        position,
        linear_velocity,
        config,
        role,
        id,
        navigator,
    } = spawn;

    let mut entity = commands.spawn((
        Rollhound,
        config,
        role,
        id,
        Replicated,
        Transform::from_translation(position),
        RigidBody::Dynamic,
        Collider::ball(BODY_RADIUS),
        Velocity::linear(linear_velocity),
        ExternalForce::default(),
        ExternalImpulse::default(),
        ActiveEvents::COLLISION_EVENTS,
    ));

    if let Some(navigator) = navigator {
        entity.insert(NavAgent(navigator));
    }

    entity.id()
}

/// System: rapier `CollisionEvent::Started` → [`AgentContact`]
///
/// For a ball the contact normal lies on the centre-to-centre line, so it is
/// taken from the two transforms.
pub fn bridge_collision_events(
    mut collisions: EventReader<CollisionEvent>,
    agents: Query<&Transform, With<Rollhound>>,
    bodies: Query<&Transform>,
    mut contacts: EventWriter<AgentContact>,
) {
    for collision in collisions.read() {
        let CollisionEvent::Started(a, b, _) = *collision else {
            continue;
        };

        for (agent, other) in [(a, b), (b, a)] {
            let (Ok(agent_transform), Ok(other_transform)) = (agents.get(agent), bodies.get(other))
            else {
                continue;
            };

            contacts.write(AgentContact {
                agent,
                other,
                normal: (agent_transform.translation - other_transform.translation)
                    .normalize_or_zero(),
            });
        }
    }
}
