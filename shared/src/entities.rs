//! NPC and monster template definitions.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};

use crate::stats::StatBlock;

/// Whether a template is a townsperson or a monster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Npc,
    Monster,
}

impl Default for EntityKind {
    fn default() -> Self {
        EntityKind::Monster
    }
}

/// How a template treats players who share its room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Never fights back
    Passive,
    /// Fights only when attacked or when faction standing is too low
    Neutral,
    /// Warns first, then attacks after a delay
    Threatening,
    Aggressive,
    Hostile,
}

impl Default for Disposition {
    fn default() -> Self {
        Disposition::Neutral
    }
}

/// Standing change applied to the killer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactionHit {
    pub faction: String,
    pub amount: i32,
}

/// What skinning a corpse of this template yields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinningDef {
    pub skill: String,
    pub dc: i32,
    pub success_item: Option<String>,
    pub failure_item: Option<String>,
}

impl Default for SkinningDef {
    fn default() -> Self {
        Self {
            skill: "survival".into(),
            dc: 10,
            success_item: None,
            failure_item: None,
        }
    }
}

/// Immutable NPC/monster definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityTemplate {
    pub key: String,
    pub name: String,
    pub description: String,
    pub kind: EntityKind,
    pub keywords: Vec<String>,
    pub max_hp: i32,
    pub stats: StatBlock,
    pub skills: HashMap<String, i32>,
    /// Damage dice when fighting barehanded
    pub attack_damage: String,
    /// Armor type when nothing is worn on the torso
    pub innate_armor_type: Option<String>,
    pub loot_table_id: Option<String>,
    pub equipment_table_id: Option<String>,
    /// Items carried (not worn) that go into the corpse
    pub carried_items: Vec<String>,
    pub gold_dice: Option<String>,
    pub xp_value: i64,
    pub faction: Option<String>,
    pub faction_hits_on_kill: Vec<FactionHit>,
    pub respawn_time_secs: f64,
    pub respawn_chance: f64,
    pub is_unique: bool,
    pub leaves_corpse: bool,
    pub skinnable: bool,
    pub skinning: Option<SkinningDef>,
    pub disposition: Disposition,
    pub attacks_on_sight: bool,
    /// Seconds between swings once engaged, before jitter
    pub attack_delay_secs: f64,
    /// Players whose standing with this template's faction is below this are attacked
    pub faction_hostility_threshold: Option<i32>,
}

impl Default for EntityTemplate {
    fn default() -> Self {
        Self {
            key: String::new(),
            name: String::new(),
            description: String::new(),
            kind: EntityKind::Monster,
            keywords: Vec::new(),
            max_hp: 10,
            stats: StatBlock::default(),
            skills: HashMap::new(),
            attack_damage: "1d2".into(),
            innate_armor_type: None,
            loot_table_id: None,
            equipment_table_id: None,
            carried_items: Vec::new(),
            gold_dice: None,
            xp_value: 0,
            faction: None,
            faction_hits_on_kill: Vec::new(),
            respawn_time_secs: 300.0,
            respawn_chance: 0.2,
            is_unique: false,
            leaves_corpse: true,
            skinnable: false,
            skinning: None,
            disposition: Disposition::Neutral,
            attacks_on_sight: false,
            attack_delay_secs: 3.0,
            faction_hostility_threshold: None,
        }
    }
}

impl EntityTemplate {
    pub fn skill_rank(&self, skill: &str) -> i32 {
        self.skills.get(skill).copied().unwrap_or(0)
    }

    /// Whether this template starts a fight with a player at `standing` with its faction
    pub fn is_hostile_to(&self, standing: i32, default_threshold: i32) -> bool {
        if self.disposition == Disposition::Passive {
            return false;
        }
        if self.attacks_on_sight || matches!(self.disposition, Disposition::Aggressive | Disposition::Hostile) {
            return true;
        }
        self.faction.is_some() && standing < self.faction_hostility_threshold.unwrap_or(default_threshold)
    }

    pub fn matches(&self, word: &str) -> bool {
        let word = word.trim().to_ascii_lowercase();
        !word.is_empty()
            && (self.key == word
                || self.name.to_ascii_lowercase() == word
                || self.keywords.iter().any(|k| k.eq_ignore_ascii_case(&word)))
    }
}
