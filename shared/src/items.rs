//! Item definitions and equipment slots.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};

use crate::stats::Stat;

/// Armor type used when nothing is worn on the torso
pub const UNARMORED: &str = "unarmored";

/// Known armor types, lightest first
pub const ARMOR_TYPES: [&str; 6] = [UNARMORED, "cloth", "leather", "scale", "chain", "plate"];

/// Places an item can be worn or held
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Mainhand,
    Offhand,
    Head,
    Neck,
    Shoulders,
    Back,
    Torso,
    Arms,
    Wrists,
    Hands,
    Finger,
    Waist,
    Legs,
    Feet,
    Ear,
}

impl EquipSlot {
    pub const ALL: [EquipSlot; 15] = [
        EquipSlot::Mainhand,
        EquipSlot::Offhand,
        EquipSlot::Head,
        EquipSlot::Neck,
        EquipSlot::Shoulders,
        EquipSlot::Back,
        EquipSlot::Torso,
        EquipSlot::Arms,
        EquipSlot::Wrists,
        EquipSlot::Hands,
        EquipSlot::Finger,
        EquipSlot::Waist,
        EquipSlot::Legs,
        EquipSlot::Feet,
        EquipSlot::Ear,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EquipSlot::Mainhand => "mainhand",
            EquipSlot::Offhand => "offhand",
            EquipSlot::Head => "head",
            EquipSlot::Neck => "neck",
            EquipSlot::Shoulders => "shoulders",
            EquipSlot::Back => "back",
            EquipSlot::Torso => "torso",
            EquipSlot::Arms => "arms",
            EquipSlot::Wrists => "wrists",
            EquipSlot::Hands => "hands",
            EquipSlot::Finger => "finger",
            EquipSlot::Waist => "waist",
            EquipSlot::Legs => "legs",
            EquipSlot::Feet => "feet",
            EquipSlot::Ear => "ear",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|s| s.name() == lowered)
    }

    /// How many items the slot holds at once
    pub fn capacity(&self) -> usize {
        match self {
            EquipSlot::Finger | EquipSlot::Ear => 2,
            _ => 1,
        }
    }

    /// The other hand, for two-handed pairing
    pub fn paired_hand(&self) -> Option<Self> {
        match self {
            EquipSlot::Mainhand => Some(EquipSlot::Offhand),
            EquipSlot::Offhand => Some(EquipSlot::Mainhand),
            _ => None,
        }
    }
}

/// Item types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Weapon,
    Armor,
    Shield,
    Clothing,
    Tool,
    Material,
    Consumable,
    Treasure,
    #[serde(other)]
    Misc,
}

impl Default for ItemType {
    fn default() -> Self {
        ItemType::Misc
    }
}

/// Item template loaded from content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub item_type: ItemType,
    /// Slot names the item may be equipped to; unknown names are ignored
    pub slots: Vec<String>,
    pub two_handed: bool,
    pub keywords: Vec<String>,
    pub value: u32,

    // Weapon profile
    pub skill: Option<String>,
    pub damage: Option<String>,
    pub weapon_as_bonus: i32,
    pub enchantment_as_bonus: i32,
    /// AS modifier against each defender armor type
    pub avd_modifiers: HashMap<String, i32>,

    // Armor and shield profile
    pub armor_type: Option<String>,
    pub armor_ds_bonus: i32,
    pub enchantment_ds_bonus: i32,
    pub shield_ds_bonus: i32,

    pub stat_bonuses: HashMap<Stat, i32>,
}

impl ItemTemplate {
    /// Slots this item may occupy, skipping names that are not real slots
    pub fn allowed_slots(&self) -> Vec<EquipSlot> {
        self.slots.iter().filter_map(|s| EquipSlot::from_name(s)).collect()
    }

    pub fn allows_slot(&self, slot: EquipSlot) -> bool {
        self.allowed_slots().contains(&slot)
    }

    pub fn is_weapon(&self) -> bool {
        self.item_type == ItemType::Weapon || self.damage.is_some()
    }

    pub fn matches(&self, word: &str) -> bool {
        let word = word.trim().to_ascii_lowercase();
        !word.is_empty()
            && (self.id == word
                || self.name.to_ascii_lowercase() == word
                || self.keywords.iter().any(|k| k.eq_ignore_ascii_case(&word)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_slots_skip_unknown_names() {
        let item = ItemTemplate {
            id: "odd_ring".into(),
            slots: vec!["finger".into(), "tail".into()],
            ..Default::default()
        };
        assert_eq!(item.allowed_slots(), vec![EquipSlot::Finger]);
        assert!(!item.allows_slot(EquipSlot::Mainhand));
    }

    #[test]
    fn test_unknown_item_type_is_misc() {
        let item: ItemTemplate = serde_json::from_str(r#"{"id":"x","item_type":"relic"}"#).unwrap();
        assert_eq!(item.item_type, ItemType::Misc);
    }

    #[test]
    fn test_paired_hands() {
        assert_eq!(EquipSlot::Mainhand.paired_hand(), Some(EquipSlot::Offhand));
        assert_eq!(EquipSlot::Torso.paired_hand(), None);
    }
}
