//! Respawn tracking and corpse decay.

use std::collections::HashMap;
use log::{debug, warn};
use rand::Rng;

use mud_shared::{EntityTemplate, RoomId};

use crate::content::ContentCatalog;
use crate::entities::{EntityState, RuntimeHandle};
use super::room::RoomState;

/// A defeated entity waiting to come back
#[derive(Debug, Clone, PartialEq)]
pub struct DefeatedEntry {
    pub handle: RuntimeHandle,
    pub template_key: String,
    pub eligible_at: f64,
    pub chance: f64,
}

/// An entity that came back during a sweep
#[derive(Debug, Clone, PartialEq)]
pub struct Respawned {
    pub room: RoomId,
    pub handle: RuntimeHandle,
    pub name: String,
}

impl Respawned {
    pub fn announcement(&self) -> String {
        format!("{} has appeared.", self.name)
    }
}

/// Everything defeated and not yet back
#[derive(Debug, Clone, Default)]
pub struct RespawnTracker {
    entries: Vec<DefeatedEntry>,
}

impl RespawnTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handle: RuntimeHandle, template: &EntityTemplate, now: f64) {
        if self.entries.iter().any(|e| e.handle == handle) {
            return;
        }
        self.entries.push(DefeatedEntry {
            handle,
            template_key: template.key.clone(),
            eligible_at: now + template.respawn_time_secs,
            chance: template.respawn_chance,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DefeatedEntry] {
        &self.entries
    }

    /// Roll every eligible entry; entries that lose the roll stay eligible
    pub fn sweep<R: Rng + ?Sized>(
        &mut self,
        rooms: &mut HashMap<RoomId, RoomState>,
        catalog: &ContentCatalog,
        now: f64,
        rng: &mut R,
    ) -> Vec<Respawned> {
        let mut respawned = Vec::new();

        self.entries.retain(|entry| {
            if now < entry.eligible_at {
                return true;
            }
            let Some(room) = rooms.get_mut(&entry.handle.room) else {
                warn!("Respawn entry for missing room {}", entry.handle.room);
                return false;
            };
            let Some(template) = catalog.entity(&entry.template_key) else {
                warn!("Respawn entry for unknown template '{}'", entry.template_key);
                return false;
            };
            match room.entities.get_mut(entry.handle) {
                Some(runtime) => runtime.state = EntityState::Respawning,
                // slot was reused, nothing left to bring back
                None => return false,
            }

            if template.is_unique && room.entities.alive_count(&template.key, Some(entry.handle)) > 0 {
                return true;
            }
            if rng.gen::<f64>() >= entry.chance {
                return true;
            }

            match room.entities.respawn(entry.handle, template, catalog) {
                Some(handle) => {
                    debug!("Respawned {} in room {}", template.key, room.id);
                    respawned.push(Respawned {
                        room: room.id,
                        handle,
                        name: template.name.clone(),
                    });
                    false
                }
                None => false,
            }
        });

        respawned
    }
}

/// A corpse removed by the decay sweep
#[derive(Debug, Clone, PartialEq)]
pub struct Decayed {
    pub room: RoomId,
    pub name: String,
}

impl Decayed {
    pub fn announcement(&self) -> String {
        format!("The {} decays and disappears.", self.name)
    }
}

/// Drop every corpse whose decay time has passed
pub fn sweep_corpses(rooms: &mut HashMap<RoomId, RoomState>, now: f64) -> Vec<Decayed> {
    let mut removed = Vec::new();
    for room in rooms.values_mut() {
        for name in room.remove_decayed(now) {
            debug!("{} in room {} has decayed", name, room.id);
            removed.push(Decayed { room: room.id, name });
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Corpse, EntityRuntime};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cellar(catalog: &ContentCatalog) -> (HashMap<RoomId, RoomState>, RuntimeHandle) {
        let rat = catalog.entity("giant_rat").unwrap();
        let mut room = RoomState::new(4);
        let handle = room.entities.insert(EntityRuntime::spawn(rat, catalog));
        let mut rooms = HashMap::new();
        rooms.insert(4, room);
        (rooms, handle)
    }

    #[test]
    fn test_respawn_waits_for_delay() {
        let catalog = ContentCatalog::with_defaults();
        let rat = catalog.entity("giant_rat").unwrap();
        let (mut rooms, handle) = cellar(&catalog);
        rooms.get_mut(&4).unwrap().entities.get_mut(handle).unwrap().apply_damage(100, rat.max_hp, 10.0);

        let mut tracker = RespawnTracker::new();
        tracker.register(handle, rat, 10.0);
        let mut rng = StdRng::seed_from_u64(1);

        assert!(tracker.sweep(&mut rooms, &catalog, 10.0 + rat.respawn_time_secs - 0.1, &mut rng).is_empty());
        assert_eq!(tracker.len(), 1);

        // giant rat respawns with certainty once eligible
        let back = tracker.sweep(&mut rooms, &catalog, 10.0 + rat.respawn_time_secs, &mut rng);
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].announcement(), "Giant Rat has appeared.");
        assert!(tracker.is_empty());
        let room = &rooms[&4];
        assert!(room.entities.get(back[0].handle).unwrap().is_alive());
        assert!(room.entities.get(handle).is_none());
    }

    #[test]
    fn test_unique_never_duplicated() {
        let catalog = ContentCatalog::with_defaults();
        let rat = catalog.entity("giant_rat").unwrap();
        let (mut rooms, first) = cellar(&catalog);
        let room = rooms.get_mut(&4).unwrap();
        let second = room.entities.insert(EntityRuntime::spawn(rat, &catalog));
        room.entities.get_mut(first).unwrap().apply_damage(100, rat.max_hp, 0.0);

        let mut tracker = RespawnTracker::new();
        tracker.register(first, rat, 0.0);
        let mut rng = StdRng::seed_from_u64(2);

        for step in 0..10 {
            let now = rat.respawn_time_secs + step as f64;
            assert!(tracker.sweep(&mut rooms, &catalog, now, &mut rng).is_empty());
            assert_eq!(rooms[&4].entities.alive_count("giant_rat", None), 1);
        }
        assert_eq!(rooms[&4].entities.get(first).unwrap().state, EntityState::Respawning);

        // once the other instance falls, the waiting one may return
        rooms.get_mut(&4).unwrap().entities.get_mut(second).unwrap().apply_damage(100, rat.max_hp, 50.0);
        let back = tracker.sweep(&mut rooms, &catalog, 100.0, &mut rng);
        assert_eq!(back.len(), 1);
        assert_eq!(rooms[&4].entities.alive_count("giant_rat", None), 1);
    }

    #[test]
    fn test_failed_roll_stays_eligible() {
        let catalog = ContentCatalog::with_defaults();
        let mut goblin = catalog.entity("goblin").unwrap().clone();
        goblin.respawn_chance = 0.0;
        let mut room = RoomState::new(3);
        let handle = room.entities.insert(EntityRuntime::spawn(&goblin, &catalog));
        room.entities.get_mut(handle).unwrap().apply_damage(100, goblin.max_hp, 0.0);
        let mut rooms = HashMap::from([(3, room)]);

        let mut tracker = RespawnTracker::new();
        tracker.register(handle, &goblin, 0.0);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            assert!(tracker.sweep(&mut rooms, &catalog, 1_000.0, &mut rng).is_empty());
        }
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_corpse_present_until_decay() {
        let mut room = RoomState::new(4);
        room.corpses.insert(
            7,
            Corpse {
                id: 7,
                name: "corpse of a Giant Rat".into(),
                template_key: "giant_rat".into(),
                keywords: vec!["rat".into()],
                inventory: vec!["rat_tail".into()],
                gold: 0,
                skinnable: true,
                skinned: false,
                searched: false,
                created_at: 0.0,
                decay_at: 300.0,
            },
        );
        let mut rooms = HashMap::from([(4, room)]);

        for now in [0.0, 150.0, 299.99] {
            assert!(sweep_corpses(&mut rooms, now).is_empty());
            assert!(rooms[&4].corpses.contains_key(&7));
        }
        let decayed = sweep_corpses(&mut rooms, 300.0);
        assert_eq!(decayed.len(), 1);
        assert_eq!(decayed[0].room, 4);
        assert_eq!(decayed[0].announcement(), "The corpse of a Giant Rat decays and disappears.");
        assert!(rooms[&4].corpses.is_empty());
    }
}
