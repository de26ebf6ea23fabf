//! Rollhound Simulation Core
//!
//! ECS-симуляция на Bevy 0.16: автономный шар-преследователь
//! (rollhound), который катится к ближайшему игроку, прыгает на подъёмах и
//! размножается при контакте.
//!
//! Пайплайн одного fixed-тика (цепочкой, детерминированно):
//! Receive → Timers → Decide (authority) → Actuate → React (authority)
//!
//! Физика — rapier (ExternalForce/ExternalImpulse/Velocity), навигация —
//! внешний `NavigationBackend`, сеть — `BroadcastTransport`.

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

// Публичные модули
pub mod components;
pub mod config;
pub mod contact;
pub mod jump;
pub mod logger;
pub mod navigation;
pub mod network;
pub mod physics;
pub mod steering;
pub mod targeting;

// Re-export базовых типов для удобства
pub use components::*;
pub use config::{ConfigError, RollhoundConfig};
pub use contact::{AgentContact, ContactCooldown, DamageDealt, ReplicaSpawned};
pub use jump::{JumpIssued, JumpPolicy};
pub use logger::{init_logger, log, log_error, log_info, log_warning};
pub use navigation::{DirectNavigator, NavAgent, NavigationBackend, PathFollower};
pub use network::{
    BroadcastTransport, ImpactSound, LocalBus, NetworkId, NetworkIdAllocator, NetworkLink,
    NetworkRole, Replicated, ReplicatedEffect,
};
pub use physics::{spawn_rollhound, RollhoundSpawn};
pub use targeting::{TargetChanged, TargetLock};

/// Длительность одного fixed-тика (60Hz)
pub const FIXED_TIMESTEP: Duration = Duration::from_nanos(16_666_667);

/// Seed по умолчанию, если хост не вставил свой `DeterministicRng`
pub const DEFAULT_SEED: u64 = 42;

/// Фазы fixed-тика rollhound (chain)
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PursuitSet {
    /// Применить доставленные broadcast-эффекты
    Receive,
    /// Продвинуть таймеры агентов
    Timers,
    /// Решения: цель → маршрут → прыжок (только authority)
    Decide,
    /// Крутящий момент на всех инстансах
    Actuate,
    /// Реакция на контакты (только authority)
    React,
}

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        // Fixed timestep 60Hz для simulation tick
        app.insert_resource(Time::<Fixed>::from_duration(FIXED_TIMESTEP));

        // Хост может заранее вставить свой seed/транспорт
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(DEFAULT_SEED));
        }
        if !app.world().contains_resource::<NetworkLink>() {
            app.insert_resource(NetworkLink::loopback());
        }

        app.init_resource::<NetworkIdAllocator>()
            .init_resource::<TickCounter>()
            .add_event::<TargetChanged>()
            .add_event::<JumpIssued>()
            .add_event::<AgentContact>()
            .add_event::<DamageDealt>()
            .add_event::<ReplicaSpawned>()
            .add_event::<ImpactSound>()
            // Без RapierPhysicsPlugin (тесты) событий просто не будет
            .add_event::<bevy_rapier3d::prelude::CollisionEvent>();

        app.configure_sets(
            FixedUpdate,
            (
                PursuitSet::Receive,
                PursuitSet::Timers,
                PursuitSet::Decide.run_if(network::hosts_authority),
                PursuitSet::Actuate,
                PursuitSet::React.run_if(network::hosts_authority),
            )
                .chain(),
        );

        app.add_systems(FixedFirst, count_fixed_ticks).add_systems(
            FixedUpdate,
            (
                network::apply_broadcasts.in_set(PursuitSet::Receive),
                components::advance_rollhound_timers.in_set(PursuitSet::Timers),
                (
                    targeting::reacquire_targets,
                    navigation::follow_paths,
                    jump::evaluate_jumps,
                )
                    .chain()
                    .in_set(PursuitSet::Decide),
                steering::apply_steering.in_set(PursuitSet::Actuate),
                (physics::bridge_collision_events, contact::react_to_contacts)
                    .chain()
                    .in_set(PursuitSet::React),
            ),
        );
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Сколько fixed-тиков прошло с запуска
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickCounter(pub u64);

fn count_fixed_ticks(mut ticks: ResMut<TickCounter>) {
    ticks.0 += 1;
}

/// Создаёт minimal Bevy App для headless симуляции
///
/// Время шагает вручную на `FIXED_TIMESTEP` за `app.update()`, поэтому
/// каждый update (кроме самого первого, у него delta = 0) — ровно один
/// fixed-тик. `SimulationPlugin` добавляет вызывающий.
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_duration(FIXED_TIMESTEP))
        .insert_resource(TimeUpdateStrategy::ManualDuration(FIXED_TIMESTEP));

    app
}

/// Прогнать ровно `ticks` fixed-тиков (нужен `SimulationPlugin`)
pub fn run_fixed_ticks(app: &mut App, ticks: u64) {
    let ticks_now = |app: &App| app.world().get_resource::<TickCounter>().map_or(0, |t| t.0);

    let target = ticks_now(app) + ticks;
    // Защита от вечного цикла, если счётчик не зарегистрирован
    let mut max_updates = ticks * 2 + 4;

    while ticks_now(app) < target && max_updates > 0 {
        app.update();
        max_updates -= 1;
    }
}

/// Snapshot мира для сравнения детерминизма
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    // Сериализуем в байты через Debug (простейший способ)
    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
