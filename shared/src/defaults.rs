//! Built-in content used when no content file is available.

use std::collections::{BTreeMap, HashMap};

use crate::content::{ContentPack, EquipmentTable, LootEntry, LootQuantity, RaceDef, RoomDef};
use crate::entities::{Disposition, EntityKind, EntityTemplate, FactionHit, SkinningDef};
use crate::items::{ItemTemplate, ItemType};
use crate::stats::{Stat, StatBlock};

fn slots(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|s| s.to_string()).collect()
}

fn avd(pairs: &[(&str, i32)]) -> HashMap<String, i32> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn loot(item_id: &str, chance: f64, quantity: LootQuantity) -> LootEntry {
    LootEntry {
        item_id: item_id.into(),
        chance,
        quantity,
        requires_skinning: false,
    }
}

/// Built-in item templates for the prototype
pub fn default_items() -> Vec<ItemTemplate> {
    vec![
        ItemTemplate {
            id: "rusty_sword".into(),
            name: "Rusty Sword".into(),
            description: "A pitted and worn sword.".into(),
            item_type: ItemType::Weapon,
            slots: slots(&["mainhand", "offhand"]),
            keywords: keywords(&["sword", "rusty", "blade"]),
            value: 8,
            skill: Some("edged_weapons".into()),
            damage: Some("1d4".into()),
            weapon_as_bonus: -2,
            avd_modifiers: avd(&[("unarmored", 5), ("cloth", 3), ("leather", 0), ("chain", -5), ("plate", -10)]),
            ..Default::default()
        },
        ItemTemplate {
            id: "rusty_dagger".into(),
            name: "Rusty Dagger".into(),
            description: "A short, notched blade.".into(),
            item_type: ItemType::Weapon,
            slots: slots(&["mainhand", "offhand"]),
            keywords: keywords(&["dagger", "rusty"]),
            value: 3,
            skill: Some("edged_weapons".into()),
            damage: Some("1d3".into()),
            weapon_as_bonus: -1,
            ..Default::default()
        },
        ItemTemplate {
            id: "woodcutter_axe".into(),
            name: "Woodcutter's Axe".into(),
            description: "A heavy two-handed axe meant for timber.".into(),
            item_type: ItemType::Weapon,
            slots: slots(&["mainhand"]),
            two_handed: true,
            keywords: keywords(&["axe", "woodcutter"]),
            value: 20,
            skill: Some("two_handed_weapons".into()),
            damage: Some("1d8+1".into()),
            weapon_as_bonus: 2,
            avd_modifiers: avd(&[("unarmored", 4), ("leather", 2), ("chain", 0), ("plate", -4)]),
            ..Default::default()
        },
        ItemTemplate {
            id: "town_crier_bell".into(),
            name: "Town Crier's Bell".into(),
            description: "A sturdy brass bell, polished from frequent use.".into(),
            item_type: ItemType::Tool,
            slots: slots(&["mainhand", "offhand"]),
            keywords: keywords(&["bell", "brass"]),
            value: 15,
            skill: Some("brawling".into()),
            damage: Some("1d3".into()),
            weapon_as_bonus: -5,
            ..Default::default()
        },
        ItemTemplate {
            id: "wooden_buckler".into(),
            name: "Wooden Buckler".into(),
            description: "A small round shield of banded oak.".into(),
            item_type: ItemType::Shield,
            slots: slots(&["offhand"]),
            keywords: keywords(&["buckler", "shield"]),
            value: 10,
            shield_ds_bonus: 5,
            ..Default::default()
        },
        ItemTemplate {
            id: "old_tunic".into(),
            name: "Old Tunic".into(),
            description: "A simple tunic of coarse, faded fabric.".into(),
            item_type: ItemType::Armor,
            slots: slots(&["torso"]),
            keywords: keywords(&["tunic", "old"]),
            value: 5,
            armor_type: Some("cloth".into()),
            armor_ds_bonus: 3,
            ..Default::default()
        },
        ItemTemplate {
            id: "patchwork_jerkin".into(),
            name: "Patchwork Jerkin".into(),
            description: "A crudely stitched jerkin of hides and rags.".into(),
            item_type: ItemType::Armor,
            slots: slots(&["torso"]),
            keywords: keywords(&["jerkin", "patchwork"]),
            value: 3,
            armor_type: Some("leather".into()),
            armor_ds_bonus: 4,
            ..Default::default()
        },
        ItemTemplate {
            id: "copper_ring".into(),
            name: "Copper Ring".into(),
            description: "A plain band that makes the wearer feel a little sturdier.".into(),
            item_type: ItemType::Treasure,
            slots: slots(&["finger"]),
            keywords: keywords(&["ring", "copper"]),
            value: 12,
            stat_bonuses: [(Stat::Constitution, 5)].into_iter().collect(),
            ..Default::default()
        },
        ItemTemplate {
            id: "rat_tail".into(),
            name: "Rat Tail".into(),
            description: "A long, scaly tail.".into(),
            item_type: ItemType::Material,
            keywords: keywords(&["tail"]),
            value: 1,
            ..Default::default()
        },
        ItemTemplate {
            id: "small_bones".into(),
            name: "Small Bones".into(),
            description: "A handful of small, gnawed bones.".into(),
            item_type: ItemType::Material,
            keywords: keywords(&["bones"]),
            ..Default::default()
        },
        ItemTemplate {
            id: "rat_pelt".into(),
            name: "Rat Pelt".into(),
            description: "A greasy but intact pelt.".into(),
            item_type: ItemType::Material,
            keywords: keywords(&["pelt"]),
            value: 4,
            ..Default::default()
        },
        ItemTemplate {
            id: "ruined_pelt".into(),
            name: "Ruined Pelt".into(),
            description: "A torn scrap of hide.".into(),
            item_type: ItemType::Material,
            keywords: keywords(&["pelt", "ruined"]),
            value: 1,
            ..Default::default()
        },
        ItemTemplate {
            id: "goblin_ear".into(),
            name: "Goblin Ear".into(),
            description: "Proof of a goblin kill.".into(),
            item_type: ItemType::Material,
            keywords: keywords(&["ear"]),
            value: 2,
            ..Default::default()
        },
        ItemTemplate {
            id: "moldy_bread".into(),
            name: "Moldy Bread".into(),
            description: "Edible, in a pinch.".into(),
            item_type: ItemType::Consumable,
            keywords: keywords(&["bread"]),
            ..Default::default()
        },
    ]
}

/// Built-in NPC and monster templates
pub fn default_entities() -> Vec<EntityTemplate> {
    vec![
        EntityTemplate {
            key: "training_dummy".into(),
            name: "Training Dummy".into(),
            description: "A straw-filled dummy, patched from numerous strikes.".into(),
            keywords: keywords(&["dummy"]),
            max_hp: 30,
            stats: StatBlock::uniform(1).with(Stat::Strength, 20).with(Stat::Constitution, 100),
            attack_damage: "0d0".into(),
            xp_value: 5,
            respawn_time_secs: 60.0,
            respawn_chance: 0.75,
            disposition: Disposition::Passive,
            attack_delay_secs: 999.0,
            ..Default::default()
        },
        EntityTemplate {
            key: "giant_rat".into(),
            name: "Giant Rat".into(),
            description: "A rat the size of a small dog, all teeth and matted fur.".into(),
            keywords: keywords(&["rat"]),
            max_hp: 25,
            stats: StatBlock::uniform(20)
                .with(Stat::Strength, 30)
                .with(Stat::Agility, 50)
                .with(Stat::Dexterity, 45),
            skills: [("brawling".to_string(), 10)].into_iter().collect(),
            attack_damage: "1d4".into(),
            innate_armor_type: Some("leather".into()),
            loot_table_id: Some("giant_rat_loot".into()),
            xp_value: 20,
            faction: Some("vermin".into()),
            respawn_time_secs: 20.0,
            respawn_chance: 1.0,
            is_unique: true,
            disposition: Disposition::Aggressive,
            attack_delay_secs: 2.0,
            skinnable: true,
            skinning: Some(SkinningDef {
                skill: "survival".into(),
                dc: 8,
                success_item: Some("rat_pelt".into()),
                failure_item: Some("ruined_pelt".into()),
            }),
            ..Default::default()
        },
        EntityTemplate {
            key: "goblin".into(),
            name: "Goblin".into(),
            description: "A wiry goblin with a mean squint.".into(),
            keywords: keywords(&["goblin"]),
            max_hp: 35,
            stats: StatBlock::uniform(30).with(Stat::Strength, 45).with(Stat::Agility, 55),
            skills: [("edged_weapons".to_string(), 20)].into_iter().collect(),
            attack_damage: "1d3".into(),
            loot_table_id: Some("goblin_loot".into()),
            equipment_table_id: Some("goblin_gear".into()),
            gold_dice: Some("1d6".into()),
            xp_value: 40,
            faction: Some("goblins".into()),
            faction_hits_on_kill: vec![
                FactionHit { faction: "goblins".into(), amount: -10 },
                FactionHit { faction: "oakhaven".into(), amount: 5 },
            ],
            respawn_time_secs: 120.0,
            respawn_chance: 0.5,
            disposition: Disposition::Aggressive,
            attack_delay_secs: 2.8,
            ..Default::default()
        },
        EntityTemplate {
            key: "town_crier".into(),
            name: "Timothy the Town Crier".into(),
            description: "A loud man with a louder bell.".into(),
            kind: EntityKind::Npc,
            keywords: keywords(&["timothy", "crier"]),
            max_hp: 40,
            stats: StatBlock::uniform(40),
            carried_items: vec!["moldy_bread".into()],
            equipment_table_id: Some("town_crier_gear".into()),
            xp_value: 10,
            faction: Some("oakhaven".into()),
            faction_hits_on_kill: vec![FactionHit { faction: "oakhaven".into(), amount: -50 }],
            respawn_time_secs: 600.0,
            respawn_chance: 1.0,
            is_unique: true,
            attack_delay_secs: 2.5,
            ..Default::default()
        },
    ]
}

/// Built-in rooms: a small town square, its street, a forest path and a cellar
pub fn default_rooms() -> Vec<RoomDef> {
    let exits = |pairs: &[(&str, u32)]| -> BTreeMap<String, u32> {
        pairs.iter().map(|(d, r)| (d.to_string(), *r)).collect()
    };

    vec![
        RoomDef {
            id: 1,
            name: "Oakhaven Well - Town Center".into(),
            description: "Worn cobblestones radiate outward from a moss-speckled stone well.".into(),
            exits: exits(&[("north", 2), ("east", 3), ("down", 4)]),
            monsters: vec!["training_dummy".into()],
            is_node: true,
            is_town: true,
            is_outdoor: true,
            ..Default::default()
        },
        RoomDef {
            id: 2,
            name: "Market Street".into(),
            description: "Stalls line both sides of the muddy street.".into(),
            exits: exits(&[("south", 1)]),
            npcs: vec!["town_crier".into()],
            is_town: true,
            is_outdoor: true,
            ..Default::default()
        },
        RoomDef {
            id: 3,
            name: "Forest Path".into(),
            description: "The path narrows between dark pines.".into(),
            exits: exits(&[("west", 1)]),
            monsters: vec!["goblin".into(), "goblin".into()],
            is_outdoor: true,
            ..Default::default()
        },
        RoomDef {
            id: 4,
            name: "Damp Cellar".into(),
            description: "Water drips from the low ceiling onto packed earth.".into(),
            exits: exits(&[("up", 1)]),
            monsters: vec!["giant_rat".into()],
            is_underground: true,
            ..Default::default()
        },
    ]
}

pub fn default_loot_tables() -> HashMap<String, Vec<LootEntry>> {
    let mut tables = HashMap::new();
    tables.insert(
        "giant_rat_loot".to_string(),
        vec![
            loot("rat_tail", 0.75, LootQuantity::Fixed(1)),
            loot("small_bones", 0.5, LootQuantity::Range([1, 3])),
            LootEntry {
                item_id: "rat_pelt".into(),
                chance: 0.4,
                quantity: LootQuantity::Fixed(1),
                requires_skinning: true,
            },
        ],
    );
    tables.insert(
        "goblin_loot".to_string(),
        vec![
            loot("goblin_ear", 0.6, LootQuantity::Range([1, 2])),
            loot("rusty_dagger", 0.15, LootQuantity::Fixed(1)),
            loot("moldy_bread", 0.3, LootQuantity::Fixed(1)),
        ],
    );
    tables
}

pub fn default_equipment_tables() -> HashMap<String, EquipmentTable> {
    let mut tables = HashMap::new();
    tables.insert(
        "goblin_gear".to_string(),
        EquipmentTable {
            slots: [("mainhand", "rusty_sword"), ("torso", "patchwork_jerkin")]
                .into_iter()
                .map(|(s, i)| (s.to_string(), i.to_string()))
                .collect(),
            always_drop_equipped: Vec::new(),
            chance_drop_other_equipped: Some(0.5),
        },
    );
    tables.insert(
        "town_crier_gear".to_string(),
        EquipmentTable {
            slots: [("mainhand", "town_crier_bell"), ("torso", "old_tunic")]
                .into_iter()
                .map(|(s, i)| (s.to_string(), i.to_string()))
                .collect(),
            always_drop_equipped: vec!["town_crier_bell".into()],
            chance_drop_other_equipped: Some(0.25),
        },
    );
    tables
}

pub fn default_races() -> Vec<RaceDef> {
    vec![
        RaceDef {
            id: "human".into(),
            name: "Human".into(),
            description: "Versatile and driven.".into(),
            primary_bonus_mods: [(Stat::Charisma, 1), (Stat::Wisdom, 1), (Stat::Logic, 1)].into_iter().collect(),
            skill_bonuses: [("survival".to_string(), 5)].into_iter().collect(),
            bonus_training_points: 10,
            ..Default::default()
        },
        RaceDef {
            id: "dwarf".into(),
            name: "Dwarf".into(),
            description: "Stout and stubborn.".into(),
            stat_modifiers: [(Stat::Constitution, 10), (Stat::Agility, -5)].into_iter().collect(),
            primary_bonus_mods: [(Stat::Constitution, 1)].into_iter().collect(),
            bonus_training_points: 5,
            ..Default::default()
        },
        RaceDef {
            id: "elf".into(),
            name: "Elf".into(),
            description: "Graceful and long-lived.".into(),
            stat_modifiers: [(Stat::Agility, 10), (Stat::Constitution, -5)].into_iter().collect(),
            primary_bonus_mods: [(Stat::Agility, 1), (Stat::Aura, 1)].into_iter().collect(),
            bonus_training_points: 5,
            ..Default::default()
        },
    ]
}

/// The full built-in content set
pub fn default_content() -> ContentPack {
    ContentPack {
        items: default_items(),
        entities: default_entities(),
        rooms: default_rooms(),
        loot_tables: default_loot_tables(),
        equipment_tables: default_equipment_tables(),
        races: default_races(),
    }
}
