//! Character attributes shared by players and entity templates.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

/// Value a stat takes when a block does not list it
pub const DEFAULT_STAT_VALUE: i32 = 10;

/// The twelve named attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Strength,
    Stamina,
    Dexterity,
    Agility,
    Constitution,
    Charisma,
    Intelligence,
    Wisdom,
    Logic,
    Perception,
    Aura,
    Willpower,
}

impl Stat {
    pub const ALL: [Stat; 12] = [
        Stat::Strength,
        Stat::Stamina,
        Stat::Dexterity,
        Stat::Agility,
        Stat::Constitution,
        Stat::Charisma,
        Stat::Intelligence,
        Stat::Wisdom,
        Stat::Logic,
        Stat::Perception,
        Stat::Aura,
        Stat::Willpower,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stat::Strength => "strength",
            Stat::Stamina => "stamina",
            Stat::Dexterity => "dexterity",
            Stat::Agility => "agility",
            Stat::Constitution => "constitution",
            Stat::Charisma => "charisma",
            Stat::Intelligence => "intelligence",
            Stat::Wisdom => "wisdom",
            Stat::Logic => "logic",
            Stat::Perception => "perception",
            Stat::Aura => "aura",
            Stat::Willpower => "willpower",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|s| s.name() == lowered)
    }
}

/// A full set of attribute values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatBlock(BTreeMap<Stat, i32>);

impl StatBlock {
    /// Every stat set to the same value
    pub fn uniform(value: i32) -> Self {
        Self(Stat::ALL.into_iter().map(|s| (s, value)).collect())
    }

    /// Value of a stat, falling back to [`DEFAULT_STAT_VALUE`]
    pub fn get(&self, stat: Stat) -> i32 {
        self.0.get(&stat).copied().unwrap_or(DEFAULT_STAT_VALUE)
    }

    pub fn set(&mut self, stat: Stat, value: i32) {
        self.0.insert(stat, value);
    }

    pub fn add(&mut self, stat: Stat, delta: i32) {
        let value = self.get(stat) + delta;
        self.0.insert(stat, value);
    }

    pub fn with(mut self, stat: Stat, value: i32) -> Self {
        self.set(stat, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_stat_uses_default() {
        let block = StatBlock::default();
        assert_eq!(block.get(Stat::Logic), DEFAULT_STAT_VALUE);
    }

    #[test]
    fn test_stat_names_round_trip() {
        for stat in Stat::ALL {
            assert_eq!(Stat::from_name(stat.name()), Some(stat));
        }
        assert_eq!(Stat::from_name(" Agility "), Some(Stat::Agility));
        assert_eq!(Stat::from_name("luck"), None);
    }

    #[test]
    fn test_stat_block_json_keys() {
        let block = StatBlock::default().with(Stat::Strength, 70);
        let json = serde_json::to_string(&block).unwrap();
        assert_eq!(json, r#"{"strength":70}"#);
    }
}
