//! Game world state owned by the tick loop.

mod arena;
mod lifecycle;
mod room;

pub use arena::EntityArena;
pub use lifecycle::{sweep_corpses, Decayed, DefeatedEntry, RespawnTracker, Respawned};
pub use room::RoomState;

use std::collections::HashMap;
use log::{info, warn};

use mud_shared::{PlayerId, RoomId};

use crate::aggression::AggressionTracker;
use crate::config::GameConfig;
use crate::content::ContentCatalog;
use crate::entities::{CorpseId, EntityRuntime, Player};
use crate::environment::Environment;

/// The game world: rooms, their occupants and everyone logged in
pub struct GameWorld {
    pub catalog: ContentCatalog,
    pub config: GameConfig,
    pub rooms: HashMap<RoomId, RoomState>,
    pub players: HashMap<PlayerId, Player>,
    pub environment: Environment,
    pub respawns: RespawnTracker,
    pub aggression: AggressionTracker,
    next_corpse_id: CorpseId,
}

impl GameWorld {
    pub fn new(catalog: ContentCatalog, config: GameConfig) -> Self {
        let mut world = Self {
            catalog,
            config,
            rooms: HashMap::new(),
            players: HashMap::new(),
            environment: Environment::new(),
            respawns: RespawnTracker::new(),
            aggression: AggressionTracker::new(),
            next_corpse_id: 1,
        };
        world.spawn_all_rooms();
        world
    }

    /// Populate every room with the monsters and NPCs its definition lists
    fn spawn_all_rooms(&mut self) {
        let mut total_spawned = 0;

        for def in self.catalog.rooms() {
            let mut state = RoomState::new(def.id);
            for key in def.monsters.iter().chain(def.npcs.iter()) {
                match self.catalog.entity(key) {
                    Some(template) => {
                        state.entities.insert(EntityRuntime::spawn(template, &self.catalog));
                        total_spawned += 1;
                    }
                    None => warn!("Room {} lists unknown entity '{}'", def.id, key),
                }
            }
            self.rooms.insert(def.id, state);
        }

        info!("Spawned {} entities across {} rooms", total_spawned, self.rooms.len());
    }

    /// Place a player in the world, moving them to the start room if theirs is gone
    pub fn add_player(&mut self, mut player: Player) {
        if !self.rooms.contains_key(&player.room_id) {
            warn!(
                "Player {} was in missing room {}; moving to start room",
                player.id, player.room_id
            );
            player.room_id = self.config.player.start_room;
        }
        player.recompute_derived(&self.catalog);
        self.players.insert(player.id, player);
    }

    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Ids of the players standing in a room
    pub fn players_in_room(&self, room: RoomId) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| p.room_id == room)
            .map(|p| p.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of players in rooms open to the sky
    pub fn exposed_players(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| self.catalog.room(p.room_id).map(|r| r.is_exposed()).unwrap_or(false))
            .map(|p| p.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn allocate_corpse_id(&mut self) -> CorpseId {
        let id = self.next_corpse_id;
        self.next_corpse_id += 1;
        id
    }

    /// Full room description as seen by `viewer`
    pub fn describe_room(&self, room_id: RoomId, viewer: PlayerId) -> String {
        let Some(def) = self.catalog.room(room_id) else {
            return "You are nowhere at all.".to_string();
        };
        let mut lines = vec![format!("[{}]", def.name), def.description.clone()];

        if def.is_exposed() {
            lines.push(self.environment.describe());
        }

        if let Some(state) = self.rooms.get(&room_id) {
            let mut seen: Vec<String> = state.alive_names().into_iter().map(str::to_string).collect();
            seen.extend(state.corpses.values().map(|c| c.name.clone()));
            seen.extend(state.ground_items.iter().map(|id| self.catalog.item_name(id).to_string()));
            if !seen.is_empty() {
                lines.push(format!("You see: {}.", seen.join(", ")));
            }
        }

        let others: Vec<&str> = self
            .players
            .values()
            .filter(|p| p.room_id == room_id && p.id != viewer)
            .map(|p| p.name.as_str())
            .collect();
        if !others.is_empty() {
            lines.push(format!("Also here: {}.", others.join(", ")));
        }

        if def.exits.is_empty() {
            lines.push("Obvious exits: none.".to_string());
        } else {
            let exits: Vec<&str> = def.exits.keys().map(String::as_str).collect();
            lines.push(format!("Obvious exits: {}.", exits.join(", ")));
        }

        lines.join("\n")
    }
}
