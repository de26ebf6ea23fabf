//! Target-side components: player tag, controller capability, health.

use bevy::prelude::*;

/// Тег "player" — только такие entity могут быть целью rollhound
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Player;

/// Controller capability of a player entity.
///
/// Players without an attached controller (spectators, disconnected
/// bodies) are never targeted.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct PlayerController;

/// Здоровье (damage-receiving capability)
///
/// Инвариант: 0 ≤ current ≤ max
#[derive(Component, Debug, Clone, Copy)]
pub struct Health {
    pub current: u32,
    pub max: u32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Health {
    pub fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0
    }

    pub fn take_damage(&mut self, amount: u32) {
        self.current = self.current.saturating_sub(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_damage() {
        let mut health = Health::new(100);

        health.take_damage(30);
        assert_eq!(health.current, 70);
        assert!(health.is_alive());

        health.take_damage(100); // Saturating sub
        assert_eq!(health.current, 0);
        assert!(!health.is_alive());
    }
}
