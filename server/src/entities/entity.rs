//! Live instances of NPC and monster templates.

use mud_shared::{EntityKind, EntityTemplate, RoomId};

use crate::content::ContentCatalog;
use super::equipment::{Equipment, EquipmentHolder};

/// Generation-stamped index of an entity within its room's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuntimeHandle {
    pub room: RoomId,
    pub index: u32,
    pub generation: u32,
}

/// Where an entity is in its life cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityState {
    Alive,
    /// Killed at the given game time; accepts no further combat
    Defeated { at: f64 },
    /// Past its respawn delay and waiting on the respawn roll
    Respawning,
}

/// Result of applying damage to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageApplied {
    pub remaining_hp: i32,
    /// True only on the hit that took the entity from alive to defeated
    pub defeated: bool,
}

/// One live instance of a template
#[derive(Debug, Clone)]
pub struct EntityRuntime {
    pub template_key: String,
    pub name: String,
    pub kind: EntityKind,
    /// Unset until the entity is first drawn into combat
    hp: Option<i32>,
    pub state: EntityState,
    pub equipment: Equipment,
    innate_armor_type: Option<String>,
}

impl EntityRuntime {
    /// Spawn a fresh instance, wearing whatever its equipment table lists
    pub fn spawn(template: &EntityTemplate, catalog: &ContentCatalog) -> Self {
        Self {
            template_key: template.key.clone(),
            name: template.name.clone(),
            kind: template.kind,
            hp: None,
            state: EntityState::Alive,
            equipment: gear_for(template, catalog),
            innate_armor_type: template.innate_armor_type.clone(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state == EntityState::Alive
    }

    pub fn is_defeated(&self) -> bool {
        !self.is_alive()
    }

    /// Current HP, if the entity has been in combat
    pub fn hp(&self) -> Option<i32> {
        self.hp
    }

    /// Apply damage, initialising HP from the template on first contact.
    ///
    /// Damage to an entity that is not alive changes nothing.
    pub fn apply_damage(&mut self, amount: i32, max_hp: i32, now: f64) -> DamageApplied {
        if !self.is_alive() {
            return DamageApplied {
                remaining_hp: self.hp.unwrap_or(0),
                defeated: false,
            };
        }

        let current = self.hp.unwrap_or(max_hp);
        let remaining = current - amount.max(0);
        self.hp = Some(remaining);

        let defeated = remaining <= 0;
        if defeated {
            self.state = EntityState::Defeated { at: now };
        }
        DamageApplied { remaining_hp: remaining, defeated }
    }

    /// Bring the entity back to a fresh alive state
    pub fn reset(&mut self, template: &EntityTemplate, catalog: &ContentCatalog) {
        self.hp = None;
        self.state = EntityState::Alive;
        self.equipment = gear_for(template, catalog);
        self.name = template.name.clone();
        self.innate_armor_type = template.innate_armor_type.clone();
    }
}

fn gear_for(template: &EntityTemplate, catalog: &ContentCatalog) -> Equipment {
    let Some(table_id) = &template.equipment_table_id else {
        return Equipment::new();
    };
    match catalog.equipment_table(table_id) {
        Some(table) => Equipment::from_table(table, catalog, &template.key),
        None => {
            log::warn!("{}: unknown equipment table '{}'", template.key, table_id);
            Equipment::new()
        }
    }
}

impl EquipmentHolder for EntityRuntime {
    fn equipment(&self) -> &Equipment {
        &self.equipment
    }

    fn innate_armor_type(&self) -> Option<&str> {
        self.innate_armor_type.as_deref()
    }
}
