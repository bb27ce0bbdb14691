//! Mutable state of a single room.

use std::collections::BTreeMap;

use mud_shared::RoomId;

use crate::content::ContentCatalog;
use crate::entities::{Corpse, CorpseId, RuntimeHandle};
use super::arena::EntityArena;

#[derive(Debug, Clone)]
pub struct RoomState {
    pub id: RoomId,
    pub entities: EntityArena,
    pub corpses: BTreeMap<CorpseId, Corpse>,
    /// Items lying on the floor
    pub ground_items: Vec<String>,
}

impl RoomState {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            entities: EntityArena::new(id),
            corpses: BTreeMap::new(),
            ground_items: Vec::new(),
        }
    }

    /// Resolve a word to an entity here.
    ///
    /// Live entities win; a defeated one is returned only when nothing alive
    /// matches, so a repeat attack can be told it is already down.
    pub fn find_entity(&self, word: &str, catalog: &ContentCatalog) -> Option<RuntimeHandle> {
        let mut fallback = None;
        for (handle, entity) in self.entities.iter() {
            let matches = catalog
                .entity(&entity.template_key)
                .map(|t| t.matches(word))
                .unwrap_or_else(|| entity.name.eq_ignore_ascii_case(word));
            if !matches {
                continue;
            }
            if entity.is_alive() {
                return Some(handle);
            }
            fallback.get_or_insert(handle);
        }
        fallback
    }

    /// Most recent corpse matching the word
    pub fn find_corpse(&self, word: &str) -> Option<CorpseId> {
        self.corpses
            .values()
            .rev()
            .find(|c| c.matches(word))
            .map(|c| c.id)
    }

    /// Names of the entities standing here
    pub fn alive_names(&self) -> Vec<&str> {
        self.entities
            .iter()
            .filter(|(_, e)| e.is_alive())
            .map(|(_, e)| e.name.as_str())
            .collect()
    }

    /// Remove corpses whose time is up; returns their names
    pub fn remove_decayed(&mut self, now: f64) -> Vec<String> {
        let decayed: Vec<CorpseId> = self
            .corpses
            .values()
            .filter(|c| c.is_decayed(now))
            .map(|c| c.id)
            .collect();
        decayed
            .into_iter()
            .filter_map(|id| self.corpses.remove(&id))
            .map(|c| c.name)
            .collect()
    }
}
