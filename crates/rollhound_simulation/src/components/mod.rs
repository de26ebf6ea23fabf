//! ECS Components для rollhound и его целей
//!
//! Организация по доменам:
//! - actor: сторона цели (Player, PlayerController, Health)
//! - rollhound: агент-преследователь (Rollhound, DesiredDirection, таймеры)
//!
//! Состояние отдельных подсистем (TargetLock, PathFollower, JumpPolicy,
//! ContactCooldown) живёт рядом со своей логикой.

pub mod actor;
pub mod rollhound;

pub use actor::*;
pub use rollhound::*;
