//! Headless симуляция Rollhound
//!
//! Игрок бегает по кругу по холмистой площадке, пара rollhound'ов гонится
//! за ним. Без рендера: прогресс пишется в лог.

use std::sync::Arc;

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use rollhound_simulation::{
    create_headless_app, init_logger, log_info, run_fixed_ticks, spawn_rollhound, DamageDealt,
    DirectNavigator, Health, NetworkIdAllocator, Player, PlayerController, ReplicaSpawned,
    Rollhound, RollhoundConfig, RollhoundSpawn, SimulationPlugin, TickCounter,
};

const TICKS: u64 = 1000;
const REPORT_EVERY: u64 = 100;
const CIRCLE_RADIUS: f32 = 12.0;

/// Маркер: игрок, которого двигает скрипт демо
#[derive(Component)]
struct ScriptedRunner;

/// Рельеф для лукахеда навигатора (пол у rapier плоский)
fn hills(point: Vec2) -> f32 {
    (point.x * 0.25).sin() * 1.5
}

fn main() {
    let seed = 42;
    init_logger();
    log_info(&format!("Starting Rollhound headless simulation (seed: {})", seed));

    let config = match std::env::args().nth(1) {
        Some(path) => RollhoundConfig::load_or_default(&path),
        None => RollhoundConfig::default(),
    };

    let mut app = create_headless_app(seed);
    app.add_plugins((
        TransformPlugin,
        RapierPhysicsPlugin::<NoUserData>::default(),
        SimulationPlugin,
    ))
    .insert_resource(DemoConfig(config))
    .add_systems(Startup, setup_scene)
    .add_systems(FixedUpdate, run_in_circles);

    for _ in 0..TICKS / REPORT_EVERY {
        run_fixed_ticks(&mut app, REPORT_EVERY);
        report(&mut app);
    }

    log_info("Simulation complete!");
}

#[derive(Resource)]
struct DemoConfig(RollhoundConfig);

fn setup_scene(
    mut commands: Commands,
    config: Res<DemoConfig>,
    mut ids: ResMut<NetworkIdAllocator>,
) {
    // Пол
    commands.spawn((
        Transform::from_xyz(0.0, -0.5, 0.0),
        RigidBody::Fixed,
        Collider::cuboid(100.0, 0.5, 100.0),
    ));

    commands.spawn((
        Player,
        PlayerController,
        Health::new(100),
        ScriptedRunner,
        Transform::from_xyz(CIRCLE_RADIUS, 1.0, 0.0),
        RigidBody::KinematicPositionBased,
        Collider::capsule_y(0.5, 0.4),
    ));

    for position in [Vec3::new(-10.0, 0.5, -10.0), Vec3::new(10.0, 0.5, -15.0)] {
        let navigator = DirectNavigator::new().with_terrain(Arc::new(hills));
        let mut spawn = RollhoundSpawn::authority(position, ids.allocate(), navigator);
        spawn.config = config.0.clone();
        spawn_rollhound(&mut commands, spawn);
    }
}

fn run_in_circles(
    mut runners: Query<&mut Transform, With<ScriptedRunner>>,
    ticks: Res<TickCounter>,
) {
    let angle = ticks.0 as f32 * 0.01;
    for mut transform in runners.iter_mut() {
        transform.translation.x = angle.cos() * CIRCLE_RADIUS;
        transform.translation.z = angle.sin() * CIRCLE_RADIUS;
    }
}

fn report(app: &mut App) {
    let tick = app.world().resource::<TickCounter>().0;

    let world = app.world_mut();
    let hounds = world.query_filtered::<(), With<Rollhound>>().iter(world).count();
    let health = world
        .query_filtered::<&Health, With<Player>>()
        .iter(world)
        .next()
        .map_or(0, |health| health.current);

    let damage_events = world.resource::<Events<DamageDealt>>().len();
    let spawn_events = world.resource::<Events<ReplicaSpawned>>().len();

    log_info(&format!(
        "Tick {}: {} rollhounds, player health {} (recent: {} hits, {} replicas)",
        tick, hounds, health, damage_events, spawn_events
    ));
}
