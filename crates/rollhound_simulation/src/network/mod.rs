//! Network authority gate and broadcast replication.
//!
//! Exactly one simulation instance per rollhound holds [`NetworkRole::Authority`]
//! and computes decisions (targeting, routes, jumps, contact reactions). Every
//! other instance is an [`NetworkRole::Observer`] that only rolls along and
//! replays broadcast effects.
//!
//! Effects that must look identical everywhere (jump impulse, knockback,
//! impact sound) go through [`NetworkLink::broadcast`]: fire-and-forget,
//! delivered to every instance including the sender, applied on receipt by
//! [`apply_broadcasts`]. No acknowledgement, no ordering between broadcasts.

use bevy::prelude::*;
use bevy_rapier3d::prelude::ExternalImpulse;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::components::Rollhound;
use crate::jump::JumpPolicy;

#[cfg(test)]
mod transport_tests;

/// Роль инстанса симуляции для конкретного агента (фиксирована на всё время жизни)
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkRole {
    #[default]
    Authority,
    Observer,
}

impl NetworkRole {
    pub fn is_authority(&self) -> bool {
        matches!(self, NetworkRole::Authority)
    }
}

/// Stable id of one agent, shared by all its instances across peers.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkId(pub u64);

impl NetworkId {
    /// Peer that minted this id (see [`NetworkIdAllocator`]).
    pub fn peer(&self) -> u16 {
        (self.0 >> NetworkIdAllocator::PEER_SHIFT) as u16
    }
}

/// Marker: entity is visible network-wide (state sync picks it up).
///
/// Примеры:
/// - Rollhound и его реплики — YES
/// - Локальные эффекты — NO
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Replicated;

/// Hands out fresh [`NetworkId`]s on this peer.
///
/// The peer index lives in the top 16 bits, so authorities on different
/// peers never mint the same id. `SimulationPlugin` only inserts the peer-0
/// default: a multi-peer host must insert `NetworkIdAllocator::for_peer(n)`
/// with a distinct `n` per world before adding the plugin.
#[derive(Resource, Debug, Clone)]
pub struct NetworkIdAllocator {
    peer: u16,
    next: u64,
}

impl Default for NetworkIdAllocator {
    fn default() -> Self {
        Self::for_peer(0)
    }
}

impl NetworkIdAllocator {
    const PEER_SHIFT: u32 = 48;

    pub fn for_peer(peer: u16) -> Self {
        Self { peer, next: 1 }
    }

    pub fn allocate(&mut self) -> NetworkId {
        let local = self.next & ((1u64 << Self::PEER_SHIFT) - 1);
        self.next += 1;
        NetworkId(((self.peer as u64) << Self::PEER_SHIFT) | local)
    }
}

/// Effect replayed identically on every instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplicatedEffect {
    /// Upward jump impulse; also opens the leap-assist window
    Jump { impulse: Vec3 },
    /// Contact pushback
    Knockback { impulse: Vec3 },
    /// Impact sound cue at a world position
    ImpactSound { position: Vec3 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Broadcast {
    pub target: NetworkId,
    pub effect: ReplicatedEffect,
}

/// Delivery primitive consumed from the replication layer.
pub trait BroadcastTransport: Send + Sync + 'static {
    /// Queue `message` for every instance (sender included). Never blocks.
    fn send(&mut self, message: Broadcast);

    /// Drain everything delivered to this instance since the last poll.
    fn poll(&mut self) -> Vec<Broadcast>;
}

/// In-process bus connecting several simulation worlds.
///
/// Each [`LocalBus::join`] creates one peer endpoint; a send is copied into
/// every live endpoint's inbox. Dropping an endpoint retires its inbox.
#[derive(Clone, Default)]
pub struct LocalBus {
    inboxes: Arc<Mutex<Vec<Option<VecDeque<Broadcast>>>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self) -> BusTransport {
        let mut inboxes = self.lock();
        // Слот ушедшего пира переиспользуем
        let slot = match inboxes.iter().position(Option::is_none) {
            Some(free) => {
                inboxes[free] = Some(VecDeque::new());
                free
            }
            None => {
                inboxes.push(Some(VecDeque::new()));
                inboxes.len() - 1
            }
        };
        BusTransport {
            bus: self.clone(),
            slot,
        }
    }

    /// Endpoints currently attached.
    pub fn peer_count(&self) -> usize {
        self.lock().iter().filter(|inbox| inbox.is_some()).count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Option<VecDeque<Broadcast>>>> {
        self.inboxes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One peer's endpoint on a [`LocalBus`].
pub struct BusTransport {
    bus: LocalBus,
    slot: usize,
}

impl BroadcastTransport for BusTransport {
    fn send(&mut self, message: Broadcast) {
        for inbox in self.bus.lock().iter_mut().flatten() {
            inbox.push_back(message);
        }
    }

    fn poll(&mut self) -> Vec<Broadcast> {
        self.bus
            .lock()
            .get_mut(self.slot)
            .and_then(Option::as_mut)
            .map(|inbox| inbox.drain(..).collect())
            .unwrap_or_default()
    }
}

impl Drop for BusTransport {
    fn drop(&mut self) {
        if let Some(inbox) = self.bus.lock().get_mut(self.slot) {
            *inbox = None;
        }
    }
}

/// Handle to the broadcast transport used by this world.
#[derive(Resource)]
pub struct NetworkLink {
    transport: Box<dyn BroadcastTransport>,
    sent: u64,
}

impl NetworkLink {
    pub fn new(transport: impl BroadcastTransport) -> Self {
        Self {
            transport: Box::new(transport),
            sent: 0,
        }
    }

    /// Single-peer bus: every broadcast comes back to this world only.
    pub fn loopback() -> Self {
        Self::new(LocalBus::new().join())
    }

    pub fn broadcast(&mut self, target: NetworkId, effect: ReplicatedEffect) {
        self.sent += 1;
        self.transport.send(Broadcast { target, effect });
    }

    pub fn poll(&mut self) -> Vec<Broadcast> {
        self.transport.poll()
    }

    /// Broadcasts issued by this world so far.
    pub fn sent_count(&self) -> u64 {
        self.sent
    }
}

/// Event: impact sound cue for the audio layer (emitted on every instance)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ImpactSound {
    pub source: Entity,
    pub position: Vec3,
}

/// Run condition: the per-tick authority gate.
///
/// The whole decision pipeline is skipped on worlds that hold no
/// authoritative agents (pure observers).
pub fn hosts_authority(roles: Query<&NetworkRole, With<Rollhound>>) -> bool {
    roles.iter().any(NetworkRole::is_authority)
}

/// System: apply delivered broadcasts to local instances of their target agent
///
/// Broadcasts addressed to agents unknown in this world are dropped.
pub fn apply_broadcasts(
    mut link: ResMut<NetworkLink>,
    mut agents: Query<(Entity, &NetworkId, &mut ExternalImpulse, &mut JumpPolicy), With<Rollhound>>,
    mut sounds: EventWriter<ImpactSound>,
) {
    let delivered = link.poll();
    if delivered.is_empty() {
        return;
    }

    let by_id: HashMap<NetworkId, Entity> = agents
        .iter()
        .map(|(entity, id, _, _)| (*id, entity))
        .collect();

    for message in delivered {
        let Some(&entity) = by_id.get(&message.target) else {
            continue;
        };
        let Ok((_, _, mut impulse, mut jump)) = agents.get_mut(entity) else {
            continue;
        };

        match message.effect {
            ReplicatedEffect::Jump { impulse: jump_impulse } => {
                impulse.impulse += jump_impulse;
                jump.mark_jumped();
            }
            ReplicatedEffect::Knockback { impulse: knockback } => {
                impulse.impulse += knockback;
            }
            ReplicatedEffect::ImpactSound { position } => {
                sounds.write(ImpactSound {
                    source: entity,
                    position,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_default_is_authority() {
        assert!(NetworkRole::default().is_authority());
        assert!(!NetworkRole::Observer.is_authority());
    }

    #[test]
    fn test_allocator_ids_are_unique_per_peer() {
        let mut a = NetworkIdAllocator::for_peer(1);
        let mut b = NetworkIdAllocator::for_peer(2);

        let ids = [a.allocate(), a.allocate(), b.allocate(), b.allocate()];
        for (i, x) in ids.iter().enumerate() {
            for y in ids.iter().skip(i + 1) {
                assert_ne!(x, y);
            }
        }
    }

    #[test]
    fn test_link_counts_sent() {
        let mut link = NetworkLink::loopback();
        link.broadcast(
            NetworkId(1),
            ReplicatedEffect::ImpactSound { position: Vec3::ZERO },
        );
        assert_eq!(link.sent_count(), 1);
        assert_eq!(link.poll().len(), 1);
        assert!(link.poll().is_empty());
    }
}
