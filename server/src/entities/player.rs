//! Server-side player state.

use std::collections::HashMap;
use log::warn;
use serde::{Deserialize, Serialize};

use mud_shared::{PlayerId, RaceDef, RoomId, Stat, StatBlock, DEFAULT_STAT_VALUE};

use crate::content::ContentCatalog;
use crate::rules::primary_bonus;
use super::equipment::{Equipment, EquipmentHolder};

/// Default pack size
pub const DEFAULT_INVENTORY_CAPACITY: usize = 20;

fn default_inventory_capacity() -> usize {
    DEFAULT_INVENTORY_CAPACITY
}

/// Snapshot of the recomputed resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedStats {
    pub max_hp: i32,
    pub max_mp: i32,
    pub max_sp: i32,
    pub hp: i32,
    pub mp: i32,
    pub sp: i32,
}

/// A connected (or saved) character
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub race: String,
    pub room_id: RoomId,
    pub stats: StatBlock,
    pub skills: HashMap<String, i32>,
    pub equipment: Equipment,
    pub inventory: Vec<String>,
    #[serde(default = "default_inventory_capacity")]
    pub inventory_capacity: usize,
    pub gold: u64,

    pub hp: i32,
    pub max_hp: i32,
    pub mp: i32,
    pub max_mp: i32,
    pub sp: i32,
    pub max_sp: i32,

    pub level: u32,
    pub xp: i64,
    pub unabsorbed_xp: i64,
    pub training_points: u32,
    #[serde(default)]
    pub racial_training_bonus_granted: bool,
    pub factions: HashMap<String, i32>,

    /// Game time (seconds) before which new commands are refused
    #[serde(skip)]
    pub next_action_time: f64,
    /// Last mind status shown to the player
    #[serde(skip)]
    pub mind_status: Option<&'static str>,
    /// Grouped players absorb a little faster
    #[serde(default)]
    pub grouped: bool,
}

impl Player {
    /// Create a level-1 character of the given race, standing in `room_id`
    pub fn new(id: PlayerId, name: impl Into<String>, race: &RaceDef, room_id: RoomId, catalog: &ContentCatalog) -> Self {
        let mut stats = StatBlock::uniform(DEFAULT_STAT_VALUE);
        for (stat, delta) in &race.stat_modifiers {
            stats.add(*stat, *delta);
        }

        let mut player = Self {
            id,
            name: name.into(),
            race: race.id.clone(),
            room_id,
            stats,
            skills: race.skill_bonuses.clone(),
            equipment: Equipment::new(),
            inventory: Vec::new(),
            inventory_capacity: DEFAULT_INVENTORY_CAPACITY,
            gold: 0,
            hp: 0,
            max_hp: 0,
            mp: 0,
            max_mp: 0,
            sp: 0,
            max_sp: 0,
            level: 1,
            xp: 0,
            unabsorbed_xp: 0,
            training_points: 0,
            racial_training_bonus_granted: false,
            factions: HashMap::new(),
            next_action_time: 0.0,
            mind_status: None,
            grouped: false,
        };
        player.recompute_derived(catalog);
        player.restore_resources();
        player
    }

    pub fn skill_rank(&self, skill: &str) -> i32 {
        self.skills.get(skill).copied().unwrap_or(0)
    }

    /// Base stat plus bonuses from worn items
    pub fn effective_stat(&self, stat: Stat, catalog: &ContentCatalog) -> i32 {
        let bonus: i32 = self
            .equipment
            .item_ids()
            .iter()
            .filter_map(|id| catalog.item(id))
            .filter_map(|item| item.stat_bonuses.get(&stat))
            .sum();
        self.stats.get(stat) + bonus
    }

    /// Primary bonus for a stat, including the race modifier
    pub fn primary_bonus(&self, stat: Stat, catalog: &ContentCatalog) -> i32 {
        let race_mod = match catalog.race(&self.race) {
            Some(race) => race.primary_bonus_mod(stat),
            None => 0,
        };
        primary_bonus(self.effective_stat(stat, catalog), race_mod)
    }

    /// Recompute resource maxima from stats, gear and level.
    ///
    /// Current values move by the same amount as their maxima, so putting an
    /// item on and taking it off again leaves them where they started.
    pub fn recompute_derived(&mut self, catalog: &ContentCatalog) {
        if catalog.race(&self.race).is_none() {
            warn!("Player {} has unknown race '{}'", self.id, self.race);
        }

        let level = self.level as i32;
        let con = self.effective_stat(Stat::Constitution, catalog);
        let int = self.effective_stat(Stat::Intelligence, catalog);
        let sta = self.effective_stat(Stat::Stamina, catalog);

        let max_hp = (con * 2 + self.primary_bonus(Stat::Constitution, catalog) * 25 + level * 5).max(1);
        let max_mp = (int * 2 + self.primary_bonus(Stat::Intelligence, catalog) * 15 + level * 3).max(0);
        let max_sp = (sta * 2 + self.primary_bonus(Stat::Stamina, catalog) * 15 + level * 2).max(0);

        let conscious = self.hp > 0;
        self.hp = carry(self.hp, self.max_hp, max_hp);
        if conscious {
            // gear alone never knocks a player out
            self.hp = self.hp.max(1);
        }
        self.mp = carry(self.mp, self.max_mp, max_mp);
        self.sp = carry(self.sp, self.max_sp, max_sp);

        self.max_hp = max_hp;
        self.max_mp = max_mp;
        self.max_sp = max_sp;
    }

    /// Refill hp/mp/sp to their maxima
    pub fn restore_resources(&mut self) {
        self.hp = self.max_hp;
        self.mp = self.max_mp;
        self.sp = self.max_sp;
    }

    /// Apply incoming damage; true when this blow took the player down
    pub fn take_damage(&mut self, amount: i32) -> bool {
        let was_up = self.hp > 0;
        self.hp = self.hp.saturating_sub(amount.max(0)).max(0);
        was_up && self.hp == 0
    }

    /// Wake a defeated player in `room` with a single hit point
    pub fn revive_at(&mut self, room: RoomId) {
        self.room_id = room;
        self.hp = 1;
    }

    pub fn derived(&self) -> DerivedStats {
        DerivedStats {
            max_hp: self.max_hp,
            max_mp: self.max_mp,
            max_sp: self.max_sp,
            hp: self.hp,
            mp: self.mp,
            sp: self.sp,
        }
    }

    pub fn has_item(&self, item_id: &str) -> bool {
        self.inventory.iter().any(|i| i == item_id)
    }

    pub fn inventory_full(&self) -> bool {
        self.inventory.len() >= self.inventory_capacity
    }

    /// Add an item to the pack; false if there is no room
    pub fn add_item(&mut self, item_id: &str) -> bool {
        if self.inventory_full() {
            return false;
        }
        self.inventory.push(item_id.to_string());
        true
    }

    /// Remove one instance of an item from the pack
    pub fn remove_item(&mut self, item_id: &str) -> bool {
        match self.inventory.iter().position(|i| i == item_id) {
            Some(pos) => {
                self.inventory.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Resolve a word the player typed to an item id in the pack
    pub fn find_in_inventory(&self, word: &str, catalog: &ContentCatalog) -> Option<String> {
        self.inventory
            .iter()
            .find(|id| *id == word || catalog.item(id).map(|i| i.matches(word)).unwrap_or(false))
            .cloned()
    }

    /// Resolve a word the player typed to a worn item id
    pub fn find_equipped(&self, word: &str, catalog: &ContentCatalog) -> Option<String> {
        self.equipment
            .item_ids()
            .into_iter()
            .find(|id| id == word || catalog.item(id).map(|i| i.matches(word)).unwrap_or(false))
    }

    pub fn faction_standing(&self, faction: &str) -> i32 {
        self.factions.get(faction).copied().unwrap_or(0)
    }

    /// Shift standing with a faction, clamped to `±limit`.
    ///
    /// Returns the narration when the standing actually moved.
    pub fn adjust_faction(&mut self, faction: &str, delta: i32, limit: i32) -> Option<String> {
        if delta == 0 {
            return None;
        }
        let old = self.faction_standing(faction);
        let new = (old + delta).clamp(-limit, limit);
        if new == old {
            return None;
        }
        self.factions.insert(faction.to_string(), new);

        if new > old {
            Some(format!("Your standing with {} has improved.", faction))
        } else {
            Some(format!("Your standing with {} has worsened.", faction))
        }
    }
}

/// Shift a current value by the change in its maximum, kept within `[0, new_max]`
fn carry(current: i32, old_max: i32, new_max: i32) -> i32 {
    (current + (new_max - old_max)).clamp(0, new_max)
}

impl EquipmentHolder for Player {
    fn equipment(&self) -> &Equipment {
        &self.equipment
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A plain human-shaped player with no racial modifiers
    pub(crate) fn test_player(catalog: &ContentCatalog) -> Player {
        let race = RaceDef {
            id: "plain".into(),
            name: "Plain".into(),
            ..Default::default()
        };
        Player::new(1, "Tester", &race, 1, catalog)
    }

    #[test]
    fn test_new_player_derived_stats() {
        let catalog = ContentCatalog::with_defaults();
        let player = test_player(&catalog);
        // con 10: 20 + 0 + 5
        assert_eq!(player.max_hp, 25);
        // int 10: 20 + 0 + 3
        assert_eq!(player.max_mp, 23);
        // sta 10: 20 + 0 + 2
        assert_eq!(player.max_sp, 22);
        assert_eq!(player.hp, player.max_hp);
        assert_eq!(player.level, 1);
    }

    #[test]
    fn test_race_modifiers_apply() {
        let catalog = ContentCatalog::with_defaults();
        let dwarf = catalog.race("dwarf").unwrap().clone();
        let player = Player::new(2, "Borin", &dwarf, 1, &catalog);
        assert_eq!(player.stats.get(Stat::Constitution), 20);
        assert_eq!(player.stats.get(Stat::Agility), 5);
        // con 20: 40 + (0 + 1) * 25 + 5
        assert_eq!(player.max_hp, 70);
    }

    #[test]
    fn test_inventory_bounds() {
        let catalog = ContentCatalog::with_defaults();
        let mut player = test_player(&catalog);
        player.inventory_capacity = 2;
        assert!(player.add_item("rat_tail"));
        assert!(player.add_item("rat_tail"));
        assert!(!player.add_item("rat_tail"));
        assert!(player.remove_item("rat_tail"));
        assert_eq!(player.inventory.len(), 1);
        assert!(!player.remove_item("goblin_ear"));
    }

    #[test]
    fn test_find_by_keyword() {
        let catalog = ContentCatalog::with_defaults();
        let mut player = test_player(&catalog);
        player.add_item("rusty_sword");
        assert_eq!(player.find_in_inventory("sword", &catalog), Some("rusty_sword".into()));
        assert_eq!(player.find_in_inventory("axe", &catalog), None);
    }

    #[test]
    fn test_faction_clamps_and_narrates() {
        let catalog = ContentCatalog::with_defaults();
        let mut player = test_player(&catalog);
        assert_eq!(
            player.adjust_faction("goblins", -10, 25_000),
            Some("Your standing with goblins has worsened.".into())
        );
        assert_eq!(player.faction_standing("goblins"), -10);

        player.adjust_faction("oakhaven", 30_000, 25_000);
        assert_eq!(player.faction_standing("oakhaven"), 25_000);
        assert_eq!(player.adjust_faction("oakhaven", 5, 25_000), None);
    }

    #[test]
    fn test_defeat_and_revive() {
        let catalog = ContentCatalog::with_defaults();
        let mut player = test_player(&catalog);
        player.room_id = 4;
        player.hp = 5;

        assert!(!player.take_damage(3));
        assert_eq!(player.hp, 2);
        assert!(player.take_damage(i32::MAX));
        assert_eq!(player.hp, 0);
        // already down: no second defeat
        assert!(!player.take_damage(1));

        player.revive_at(1);
        assert_eq!(player.room_id, 1);
        assert_eq!(player.hp, 1);
    }

    #[test]
    fn test_transient_fields_not_persisted() {
        let catalog = ContentCatalog::with_defaults();
        let mut player = test_player(&catalog);
        player.next_action_time = 99.0;
        player.grouped = true;
        let json = serde_json::to_string(&player).unwrap();
        let restored: Player = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.next_action_time, 0.0);
        assert_eq!(restored.max_hp, player.max_hp);
        // group membership survives a reload along with its absorption bonus
        assert!(restored.grouped);
    }

    #[test]
    fn test_damage_carries_through_gear_changes() {
        let mut catalog = ContentCatalog::with_defaults();
        let mut ring = catalog.item("copper_ring").unwrap().clone();
        ring.id = "sapping_ring".into();
        ring.stat_bonuses = [(Stat::Constitution, -5)].into_iter().collect();
        catalog.insert_item(ring);

        let mut player = test_player(&catalog);
        player.hp -= 4;
        let before = player.derived();

        player.equipment.insert(mud_shared::EquipSlot::Finger, "sapping_ring");
        player.recompute_derived(&catalog);
        assert_eq!(player.max_hp, before.max_hp - 10);
        assert_eq!(player.hp, before.hp - 10);

        player.equipment.remove_item(mud_shared::EquipSlot::Finger, "sapping_ring");
        player.recompute_derived(&catalog);
        assert_eq!(player.derived(), before);
    }
}
