//! Contact reaction: damage, knockback, self-replication.
//!
//! Authority only. On a qualifying contact with a player the rollhound:
//! 1. broadcasts a knockback impulse and an impact sound (every instance
//!    replays them),
//! 2. damages the player once (local, not broadcast),
//! 3. spawns an independent replica at its own position and velocity,
//! 4. restarts the replication cooldown.
//!
//! The cooldown rate-limits damage on sustained contact and keeps one
//! lingering collision from spawning a storm of replicas.

use bevy::prelude::*;
use bevy_rapier3d::prelude::Velocity;

use crate::components::{Health, Player, Rollhound};
use crate::config::RollhoundConfig;
use crate::navigation::NavAgent;
use crate::network::{NetworkId, NetworkIdAllocator, NetworkLink, NetworkRole, ReplicatedEffect};
use crate::physics::{spawn_rollhound, RollhoundSpawn};

/// Seconds since the last contact reaction.
///
/// Starts at zero: a freshly spawned rollhound (replica included) waits one
/// full cooldown before it can react.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct ContactCooldown {
    pub since_replication: f32,
}

impl ContactCooldown {
    pub fn tick(&mut self, delta: f32) {
        self.since_replication += delta;
    }

    pub fn is_ready(&self, cooldown: f32) -> bool {
        self.since_replication > cooldown
    }

    pub fn reset(&mut self) {
        self.since_replication = 0.0;
    }
}

/// Event: physics contact between a rollhound and another entity
///
/// `normal` points from `other` toward `agent`.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct AgentContact {
    pub agent: Entity,
    pub other: Entity,
    pub normal: Vec3,
}

/// Event: урон нанесён (для UI, звуков, эффектов)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct DamageDealt {
    pub attacker: Entity,
    pub target: Entity,
    pub damage: u32,
    pub target_died: bool,
}

/// Event: a contact produced a new rollhound
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ReplicaSpawned {
    pub parent: Entity,
    pub replica: Entity,
    pub replica_id: NetworkId,
}

/// What the reactor knows about the other side of a contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactTarget {
    pub is_player: bool,
    pub takes_damage: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactRejection {
    NotPlayer,
    NoHealth,
    CoolingDown,
}

/// Knockback along the contact normal with a fixed upward pop.
pub fn knockback_impulse(normal: Vec3, config: &RollhoundConfig) -> Vec3 {
    let mut impulse = normal * config.self_knockback_force;
    impulse.y = config.knockback_lift;
    impulse
}

/// Gate a contact; on success returns the knockback impulse.
pub fn evaluate_contact(
    cooldown: &ContactCooldown,
    target: ContactTarget,
    normal: Vec3,
    config: &RollhoundConfig,
) -> Result<Vec3, ContactRejection> {
    if !target.is_player {
        return Err(ContactRejection::NotPlayer);
    }
    if !target.takes_damage {
        return Err(ContactRejection::NoHealth);
    }
    if !cooldown.is_ready(config.replication_cooldown) {
        return Err(ContactRejection::CoolingDown);
    }
    Ok(knockback_impulse(normal, config))
}

/// System: contact consequences (authority only)
pub fn react_to_contacts(
    mut commands: Commands,
    mut contacts: EventReader<AgentContact>,
    mut agents: Query<
        (
            &Transform,
            &Velocity,
            &RollhoundConfig,
            &NetworkRole,
            &NetworkId,
            &mut ContactCooldown,
            Option<&NavAgent>,
        ),
        With<Rollhound>,
    >,
    mut targets: Query<(Has<Player>, Option<&mut Health>), Without<Rollhound>>,
    mut link: ResMut<NetworkLink>,
    mut ids: ResMut<NetworkIdAllocator>,
    mut damage_events: EventWriter<DamageDealt>,
    mut spawned_events: EventWriter<ReplicaSpawned>,
) {
    for contact in contacts.read() {
        let Ok((transform, velocity, config, role, id, mut cooldown, nav)) =
            agents.get_mut(contact.agent)
        else {
            continue;
        };
        if !role.is_authority() {
            continue;
        }

        let Ok((is_player, mut health)) = targets.get_mut(contact.other) else {
            continue;
        };
        let target = ContactTarget {
            is_player,
            takes_damage: health.is_some(),
        };

        let Ok(knockback) = evaluate_contact(&cooldown, target, contact.normal, config) else {
            continue;
        };

        let position = transform.translation;
        link.broadcast(*id, ReplicatedEffect::Knockback { impulse: knockback });
        link.broadcast(*id, ReplicatedEffect::ImpactSound { position });

        if let Some(health) = health.as_mut() {
            let was_alive = health.is_alive();
            health.take_damage(config.damage_amount);
            damage_events.write(DamageDealt {
                attacker: contact.agent,
                target: contact.other,
                damage: config.damage_amount,
                target_died: was_alive && !health.is_alive(),
            });
        }

        let replica_id = ids.allocate();
        let replica = spawn_rollhound(
            &mut commands,
            RollhoundSpawn {
                position,
                linear_velocity: velocity.linvel,
                config: config.clone(),
                role: NetworkRole::Authority,
                id: replica_id,
                navigator: nav.map(|nav| nav.0.fork()),
            },
        );
        spawned_events.write(ReplicaSpawned {
            parent: contact.agent,
            replica,
            replica_id,
        });

        cooldown.reset();

        crate::logger::log_info(&format!(
            "Rollhound {:?} hit {:?}: {} damage, replica {:?} ({:?})",
            contact.agent, contact.other, config.damage_amount, replica, replica_id
        ));
    }
}
