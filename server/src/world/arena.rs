//! Per-room storage for spawned entities.
//!
//! Slots are never freed. A respawn reuses the slot and bumps its
//! generation, so handles taken before the respawn stop resolving.

use mud_shared::{EntityTemplate, RoomId};

use crate::content::ContentCatalog;
use crate::entities::{EntityRuntime, RuntimeHandle};

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    entity: EntityRuntime,
}

#[derive(Debug, Clone)]
pub struct EntityArena {
    room: RoomId,
    slots: Vec<Slot>,
}

impl EntityArena {
    pub fn new(room: RoomId) -> Self {
        Self { room, slots: Vec::new() }
    }

    pub fn insert(&mut self, entity: EntityRuntime) -> RuntimeHandle {
        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, entity });
        RuntimeHandle {
            room: self.room,
            index,
            generation: 0,
        }
    }

    fn slot(&self, handle: RuntimeHandle) -> Option<&Slot> {
        if handle.room != self.room {
            return None;
        }
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
    }

    pub fn get(&self, handle: RuntimeHandle) -> Option<&EntityRuntime> {
        self.slot(handle).map(|s| &s.entity)
    }

    pub fn get_mut(&mut self, handle: RuntimeHandle) -> Option<&mut EntityRuntime> {
        if handle.room != self.room {
            return None;
        }
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .map(|s| &mut s.entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RuntimeHandle, &EntityRuntime)> {
        let room = self.room;
        self.slots.iter().enumerate().map(move |(i, s)| {
            (
                RuntimeHandle {
                    room,
                    index: i as u32,
                    generation: s.generation,
                },
                &s.entity,
            )
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Live instances of a template, ignoring the slot behind `except`
    pub fn alive_count(&self, template_key: &str, except: Option<RuntimeHandle>) -> usize {
        self.iter()
            .filter(|(h, e)| Some(*h) != except && e.is_alive() && e.template_key == template_key)
            .count()
    }

    /// Reset the entity behind `handle` to a fresh instance under a new generation
    pub fn respawn(
        &mut self,
        handle: RuntimeHandle,
        template: &EntityTemplate,
        catalog: &ContentCatalog,
    ) -> Option<RuntimeHandle> {
        if handle.room != self.room {
            return None;
        }
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)?;
        slot.generation = slot.generation.wrapping_add(1);
        slot.entity.reset(template, catalog);
        Some(RuntimeHandle {
            generation: slot.generation,
            ..handle
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_handles_stop_resolving() {
        let catalog = ContentCatalog::with_defaults();
        let rat = catalog.entity("giant_rat").unwrap();
        let mut arena = EntityArena::new(4);
        let old = arena.insert(EntityRuntime::spawn(rat, &catalog));

        arena.get_mut(old).unwrap().apply_damage(100, rat.max_hp, 1.0);
        let new = arena.respawn(old, rat, &catalog).unwrap();

        assert_eq!(new.index, old.index);
        assert_ne!(new.generation, old.generation);
        assert!(arena.get(old).is_none());
        assert!(arena.get(new).unwrap().is_alive());
        assert!(arena.respawn(old, rat, &catalog).is_none());
    }

    #[test]
    fn test_handles_are_room_scoped() {
        let catalog = ContentCatalog::with_defaults();
        let goblin = catalog.entity("goblin").unwrap();
        let mut arena = EntityArena::new(3);
        let handle = arena.insert(EntityRuntime::spawn(goblin, &catalog));
        let foreign = RuntimeHandle { room: 9, ..handle };
        assert!(arena.get(foreign).is_none());
    }

    #[test]
    fn test_alive_count_excludes_defeated() {
        let catalog = ContentCatalog::with_defaults();
        let goblin = catalog.entity("goblin").unwrap();
        let mut arena = EntityArena::new(3);
        let a = arena.insert(EntityRuntime::spawn(goblin, &catalog));
        let b = arena.insert(EntityRuntime::spawn(goblin, &catalog));
        assert_eq!(arena.alive_count("goblin", None), 2);

        arena.get_mut(a).unwrap().apply_damage(100, goblin.max_hp, 0.0);
        assert_eq!(arena.alive_count("goblin", None), 1);
        assert_eq!(arena.alive_count("goblin", Some(b)), 0);
    }
}
