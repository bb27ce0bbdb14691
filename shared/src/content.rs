//! Read-only content definitions: rooms, races, loot and equipment tables.

use std::collections::{BTreeMap, HashMap};
use serde::{Deserialize, Serialize};

use crate::entities::EntityTemplate;
use crate::items::ItemTemplate;
use crate::stats::Stat;

pub type RoomId = u32;

/// How many items a loot entry yields when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LootQuantity {
    Fixed(u32),
    /// Inclusive range
    Range([u32; 2]),
}

impl Default for LootQuantity {
    fn default() -> Self {
        LootQuantity::Fixed(1)
    }
}

/// One independent roll in a loot table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LootEntry {
    pub item_id: String,
    pub chance: f64,
    #[serde(default)]
    pub quantity: LootQuantity,
    /// Only obtainable by skinning, never by the normal roll
    #[serde(default)]
    pub requires_skinning: bool,
}

pub type LootTable = Vec<LootEntry>;

/// Gear an entity spawns wearing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EquipmentTable {
    /// Slot name to item id
    pub slots: BTreeMap<String, String>,
    /// Worn items that always go into the corpse
    pub always_drop_equipped: Vec<String>,
    /// Drop chance for other worn items; the global default applies when absent
    pub chance_drop_other_equipped: Option<f64>,
}

/// Static room definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomDef {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    /// Direction to destination room
    pub exits: BTreeMap<String, RoomId>,
    pub monsters: Vec<String>,
    pub npcs: Vec<String>,
    pub is_node: bool,
    pub is_super_node: bool,
    pub is_town: bool,
    pub is_outdoor: bool,
    pub is_underground: bool,
}

impl RoomDef {
    /// Open to sky and weather
    pub fn is_exposed(&self) -> bool {
        self.is_outdoor && !self.is_underground
    }
}

/// Playable race
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceDef {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Flat adjustments applied at character creation
    pub stat_modifiers: HashMap<Stat, i32>,
    /// Added to `stat / 50` when deriving primary bonuses
    pub primary_bonus_mods: HashMap<Stat, i32>,
    pub skill_bonuses: HashMap<String, i32>,
    /// Training points granted once at level 1
    pub bonus_training_points: u32,
}

impl RaceDef {
    pub fn primary_bonus_mod(&self, stat: Stat) -> i32 {
        self.primary_bonus_mods.get(&stat).copied().unwrap_or(0)
    }
}

/// Everything the content file carries, before it is keyed for lookup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPack {
    pub items: Vec<ItemTemplate>,
    pub entities: Vec<EntityTemplate>,
    pub rooms: Vec<RoomDef>,
    pub loot_tables: HashMap<String, LootTable>,
    pub equipment_tables: HashMap<String, EquipmentTable>,
    pub races: Vec<RaceDef>,
}
