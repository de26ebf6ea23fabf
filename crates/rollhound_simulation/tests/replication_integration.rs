//! Authority/observer integration test
//!
//! Два App (authority peer и observer peer) на общем LocalBus:
//! - решения принимает только authority
//! - прыжок authority доходит до observer через broadcast

use std::sync::Arc;

use bevy::prelude::*;
use bevy_rapier3d::prelude::ExternalImpulse;
use rollhound_simulation::*;

const HOUND_ID: NetworkId = NetworkId(7);

/// Крутой подъём вдоль X: шанс прыжка = 1
fn ramp(point: Vec2) -> f32 {
    point.x
}

fn create_peer(bus: &LocalBus, seed: u64) -> App {
    let mut app = create_headless_app(seed);
    app.insert_resource(NetworkLink::new(bus.join()))
        .add_plugins(SimulationPlugin);

    app.world_mut().spawn((
        Player,
        PlayerController,
        Health::new(100),
        Transform::from_xyz(50.0, 0.0, 0.0),
    ));
    app
}

fn spawn(app: &mut App, spawn: RollhoundSpawn) -> Entity {
    let entity = {
        let mut commands = app.world_mut().commands();
        spawn_rollhound(&mut commands, spawn)
    };
    app.world_mut().flush();
    entity
}

fn step_both(authority: &mut App, observer: &mut App, ticks: u64) {
    for _ in 0..ticks {
        run_fixed_ticks(authority, 1);
        run_fixed_ticks(observer, 1);
    }
}

/// Test: прыжок authority воспроизводится на обоих инстансах
#[test]
fn test_jump_replayed_on_observer() {
    let bus = LocalBus::new();
    let mut authority = create_peer(&bus, 11);
    let mut observer = create_peer(&bus, 11);

    let navigator = DirectNavigator::new().with_terrain(Arc::new(ramp));
    let leader = spawn(
        &mut authority,
        RollhoundSpawn::authority(Vec3::ZERO, HOUND_ID, navigator),
    );
    let replica = spawn(&mut observer, RollhoundSpawn::observer(Vec3::ZERO, HOUND_ID));

    // Первая попытка прыжка — после jump_interval (2с); 150 тиков = 2.5с
    step_both(&mut authority, &mut observer, 150);

    let issued = authority.world().resource::<NetworkLink>().sent_count();
    assert_eq!(issued, 1, "exactly one jump expected");
    assert_eq!(observer.world().resource::<NetworkLink>().sent_count(), 0);

    let jump_force = RollhoundConfig::default().jump_force;
    for (app, entity) in [(&authority, leader), (&observer, replica)] {
        let impulse = app.world().get::<ExternalImpulse>(entity).unwrap();
        assert_eq!(impulse.impulse, Vec3::Y * jump_force);

        // Окно leap-assist открылось по broadcast
        let jump = app.world().get::<JumpPolicy>(entity).unwrap();
        assert!(jump.since_jump.is_finite());
    }
}

/// Test: observer-инстанс не выбирает цель, хотя игрок рядом
#[test]
fn test_observer_never_decides() {
    let bus = LocalBus::new();
    let mut authority = create_peer(&bus, 5);
    let mut observer = create_peer(&bus, 5);

    let leader = spawn(
        &mut authority,
        RollhoundSpawn::authority(Vec3::ZERO, HOUND_ID, DirectNavigator::new()),
    );
    let replica = spawn(&mut observer, RollhoundSpawn::observer(Vec3::ZERO, HOUND_ID));

    step_both(&mut authority, &mut observer, 10);

    assert!(authority.world().get::<TargetLock>(leader).unwrap().target.is_some());
    assert!(!authority
        .world()
        .get::<DesiredDirection>(leader)
        .unwrap()
        .is_idle());

    let lock = observer.world().get::<TargetLock>(replica).unwrap();
    assert_eq!(lock.target, None);
    assert_eq!(lock.consecutive_misses, 0);
    assert!(observer
        .world()
        .get::<DesiredDirection>(replica)
        .unwrap()
        .is_idle());
}

/// Test: broadcast для неизвестного агента молча отбрасывается
#[test]
fn test_broadcast_for_unknown_agent_dropped() {
    let bus = LocalBus::new();
    let mut observer = create_peer(&bus, 1);
    let replica = spawn(&mut observer, RollhoundSpawn::observer(Vec3::ZERO, HOUND_ID));

    let mut sender = NetworkLink::new(bus.join());
    sender.broadcast(
        NetworkId(999),
        ReplicatedEffect::Knockback {
            impulse: Vec3::new(1.0, 2.0, 3.0),
        },
    );
    sender.broadcast(
        HOUND_ID,
        ReplicatedEffect::Knockback {
            impulse: Vec3::new(0.0, 4.0, 0.0),
        },
    );

    run_fixed_ticks(&mut observer, 1);

    let impulse = observer.world().get::<ExternalImpulse>(replica).unwrap();
    assert_eq!(impulse.impulse, Vec3::new(0.0, 4.0, 0.0));
}

/// Test: allocator, вставленный хостом до плагина, не перезаписывается
#[test]
fn test_host_allocator_keeps_peer_index() {
    let bus = LocalBus::new();
    let mut peers: Vec<App> = (1..=2u16)
        .map(|peer| {
            let mut app = create_headless_app(9);
            app.insert_resource(NetworkIdAllocator::for_peer(peer))
                .insert_resource(NetworkLink::new(bus.join()))
                .add_plugins(SimulationPlugin);
            app
        })
        .collect();

    let ids: Vec<NetworkId> = peers
        .iter_mut()
        .map(|app| app.world_mut().resource_mut::<NetworkIdAllocator>().allocate())
        .collect();

    assert_eq!(ids[0].peer(), 1);
    assert_eq!(ids[1].peer(), 2);
    assert_ne!(ids[0], ids[1]);
}
