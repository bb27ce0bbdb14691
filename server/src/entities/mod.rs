//! Game entities: players, spawned NPCs/monsters, corpses and equipment.

pub mod corpse;
pub mod entity;
pub mod equipment;
pub mod player;

pub use corpse::{Corpse, CorpseId};
pub use entity::{DamageApplied, EntityRuntime, EntityState, RuntimeHandle};
pub use equipment::{equip, unequip, EquipError, EquipOutcome, Equipment, EquipmentHolder};
pub use player::{DerivedStats, Player};
