//! Loot tables, corpse contents and skinning.

use log::warn;
use rand::Rng;

use mud_shared::{EntityTemplate, LootQuantity, LootTable, SkinningDef};

use crate::config::LootConfig;
use crate::content::ContentCatalog;
use crate::entities::{Corpse, CorpseId, EntityRuntime};
use crate::rules::roll;

/// Roll every entry of a loot table independently.
///
/// Repeated ids in the result are stacked quantity, capped per entry at
/// `config.max_quantity_per_entry`. Entries naming unknown items or marked
/// skin-only are skipped.
pub fn resolve<R: Rng + ?Sized>(
    table: &LootTable,
    catalog: &ContentCatalog,
    config: &LootConfig,
    rng: &mut R,
) -> Vec<String> {
    let mut drops = Vec::new();

    for entry in table {
        if catalog.item(&entry.item_id).is_none() {
            warn!("Loot entry names unknown item '{}'", entry.item_id);
            continue;
        }
        if entry.requires_skinning {
            continue;
        }

        let draw: f64 = rng.gen();
        if draw >= entry.chance {
            continue;
        }

        let quantity = match entry.quantity {
            LootQuantity::Fixed(n) => n,
            LootQuantity::Range([lo, hi]) if lo <= hi => rng.gen_range(lo..=hi),
            LootQuantity::Range([lo, hi]) => {
                warn!("Loot entry '{}' has inverted range [{}, {}]", entry.item_id, lo, hi);
                lo
            }
        };
        let quantity = if quantity > config.max_quantity_per_entry {
            warn!(
                "Loot entry '{}' asks for {} items; capping at {}",
                entry.item_id, quantity, config.max_quantity_per_entry
            );
            config.max_quantity_per_entry
        } else {
            quantity
        };
        drops.extend(std::iter::repeat(entry.item_id.clone()).take(quantity as usize));
    }

    drops
}

/// What a skinning attempt yields: the success item when the skill meets the
/// difficulty, otherwise the failure item if there is one
pub fn resolve_skinning(skinning: &SkinningDef, skill: i32, catalog: &ContentCatalog) -> Vec<String> {
    let item = if skill >= skinning.dc {
        skinning.success_item.as_ref()
    } else {
        skinning.failure_item.as_ref()
    };

    match item {
        Some(id) if catalog.item(id).is_some() => vec![id.clone()],
        Some(id) => {
            warn!("Skinning yields unknown item '{}'", id);
            Vec::new()
        }
        None => Vec::new(),
    }
}

/// Reasons a corpse cannot be skinned
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkinError {
    #[error("You can't skin that.")]
    NotSkinnable,
    #[error("That has already been skinned.")]
    AlreadySkinned,
}

/// Skin a corpse once; later attempts are refused
pub fn skin_corpse(
    corpse: &mut Corpse,
    template: Option<&EntityTemplate>,
    skill_of: impl Fn(&str) -> i32,
    catalog: &ContentCatalog,
) -> Result<Vec<String>, SkinError> {
    if !corpse.skinnable {
        return Err(SkinError::NotSkinnable);
    }
    if corpse.skinned {
        return Err(SkinError::AlreadySkinned);
    }
    corpse.skinned = true;

    let skinning = template.and_then(|t| t.skinning.clone()).unwrap_or_default();
    let skill = skill_of(&skinning.skill);
    Ok(resolve_skinning(&skinning, skill, catalog))
}

/// Snapshot a defeated entity's belongings into a new corpse
#[allow(clippy::too_many_arguments)]
pub fn assemble_corpse<R: Rng + ?Sized>(
    id: CorpseId,
    runtime: &EntityRuntime,
    template: &EntityTemplate,
    catalog: &ContentCatalog,
    config: &LootConfig,
    now: f64,
    decay_secs: f64,
    rng: &mut R,
) -> Corpse {
    let mut inventory = Vec::new();

    for item in &template.carried_items {
        if catalog.item(item).is_none() {
            warn!("{}: carried item '{}' is unknown", template.key, item);
            continue;
        }
        if rng.gen::<f64>() < config.carried_drop_chance {
            inventory.push(item.clone());
        }
    }

    let table = template
        .equipment_table_id
        .as_deref()
        .and_then(|id| catalog.equipment_table(id));
    let always_drop: &[String] = table.map(|t| t.always_drop_equipped.as_slice()).unwrap_or(&[]);
    let other_chance = table
        .and_then(|t| t.chance_drop_other_equipped)
        .unwrap_or(config.equipped_drop_chance);

    for item in runtime.equipment.item_ids() {
        if always_drop.contains(&item) || rng.gen::<f64>() < other_chance {
            inventory.push(item);
        }
    }

    if let Some(table_id) = &template.loot_table_id {
        match catalog.loot_table(table_id) {
            Some(table) => inventory.extend(resolve(table, catalog, config, rng)),
            None => warn!("{}: unknown loot table '{}'", template.key, table_id),
        }
    }

    let gold = template
        .gold_dice
        .as_deref()
        .map(|dice| roll(dice, rng).max(0) as u32)
        .unwrap_or(0);

    let mut keywords = template.keywords.clone();
    keywords.push(template.key.clone());

    Corpse {
        id,
        name: format!("corpse of {}", with_article(&template.name)),
        template_key: template.key.clone(),
        keywords,
        inventory,
        gold,
        skinnable: template.skinnable,
        skinned: false,
        searched: false,
        created_at: now,
        decay_at: now + decay_secs,
    }
}

fn with_article(name: &str) -> String {
    // "Timothy the Town Crier" is a proper name
    if name.contains(" the ") {
        return name.to_string();
    }
    let vowel = name
        .chars()
        .next()
        .map(|c| "aeiouAEIOU".contains(c))
        .unwrap_or(false);
    if vowel {
        format!("an {}", name)
    } else {
        format!("a {}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mud_shared::LootEntry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn entry(item_id: &str, chance: f64, quantity: LootQuantity) -> LootEntry {
        LootEntry {
            item_id: item_id.into(),
            chance,
            quantity,
            requires_skinning: false,
        }
    }

    #[test]
    fn test_certain_and_impossible_entries() {
        let catalog = ContentCatalog::with_defaults();
        let table = vec![
            entry("rat_tail", 1.0, LootQuantity::Fixed(1)),
            entry("goblin_ear", 0.0, LootQuantity::Fixed(1)),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            let drops = resolve(&table, &catalog, &LootConfig::default(), &mut rng);
            assert!(drops.contains(&"rat_tail".to_string()));
            assert!(!drops.contains(&"goblin_ear".to_string()));
        }
    }

    #[test]
    fn test_entries_are_independent() {
        let catalog = ContentCatalog::with_defaults();
        let table = vec![
            entry("rat_tail", 1.0, LootQuantity::Fixed(2)),
            entry("small_bones", 1.0, LootQuantity::Range([1, 3])),
        ];
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..100 {
            let drops = resolve(&table, &catalog, &LootConfig::default(), &mut rng);
            assert_eq!(drops.iter().filter(|d| *d == "rat_tail").count(), 2);
            let bones = drops.iter().filter(|d| *d == "small_bones").count();
            assert!((1..=3).contains(&bones));
        }
    }

    #[test]
    fn test_unknown_and_skin_only_entries_skipped() {
        let catalog = ContentCatalog::with_defaults();
        let mut skin_only = entry("rat_pelt", 1.0, LootQuantity::Fixed(1));
        skin_only.requires_skinning = true;
        let table = vec![entry("phantom_gem", 1.0, LootQuantity::Fixed(1)), skin_only];
        let mut rng = StdRng::seed_from_u64(3);
        assert!(resolve(&table, &catalog, &LootConfig::default(), &mut rng).is_empty());
    }

    #[test]
    fn test_oversized_quantity_is_capped() {
        let catalog = ContentCatalog::with_defaults();
        let config = LootConfig::default();
        let table = vec![
            entry("rat_tail", 1.0, LootQuantity::Fixed(4_000_000_000)),
            entry("small_bones", 1.0, LootQuantity::Range([3_000_000_000, 4_000_000_000])),
        ];
        let mut rng = StdRng::seed_from_u64(4);
        let drops = resolve(&table, &catalog, &config, &mut rng);
        let cap = config.max_quantity_per_entry as usize;
        assert_eq!(drops.iter().filter(|d| *d == "rat_tail").count(), cap);
        assert_eq!(drops.iter().filter(|d| *d == "small_bones").count(), cap);
    }

    #[test]
    fn test_skinning_outcomes() {
        let catalog = ContentCatalog::with_defaults();
        let skinning = SkinningDef {
            skill: "survival".into(),
            dc: 8,
            success_item: Some("rat_pelt".into()),
            failure_item: Some("ruined_pelt".into()),
        };
        assert_eq!(resolve_skinning(&skinning, 8, &catalog), vec!["rat_pelt".to_string()]);
        assert_eq!(resolve_skinning(&skinning, 7, &catalog), vec!["ruined_pelt".to_string()]);

        let no_failure = SkinningDef { failure_item: None, ..skinning.clone() };
        assert!(resolve_skinning(&no_failure, 0, &catalog).is_empty());

        let bad_item = SkinningDef { success_item: Some("dragon_scale".into()), ..skinning };
        assert!(resolve_skinning(&bad_item, 50, &catalog).is_empty());
    }

    #[test]
    fn test_corpse_skinned_once() {
        let catalog = ContentCatalog::with_defaults();
        let rat = catalog.entity("giant_rat").unwrap();
        let runtime = EntityRuntime::spawn(rat, &catalog);
        let mut rng = StdRng::seed_from_u64(4);
        let mut corpse = assemble_corpse(1, &runtime, rat, &catalog, &LootConfig::default(), 0.0, 300.0, &mut rng);

        let first = skin_corpse(&mut corpse, Some(rat), |_| 20, &catalog).unwrap();
        assert_eq!(first, vec!["rat_pelt".to_string()]);
        assert_eq!(
            skin_corpse(&mut corpse, Some(rat), |_| 20, &catalog),
            Err(SkinError::AlreadySkinned)
        );
    }

    #[test]
    fn test_corpse_snapshot_contents() {
        let catalog = ContentCatalog::with_defaults();
        let crier = catalog.entity("town_crier").unwrap();
        let runtime = EntityRuntime::spawn(crier, &catalog);
        let config = LootConfig::default();
        let mut rng = StdRng::seed_from_u64(5);

        for id in 0..50 {
            let corpse = assemble_corpse(id, &runtime, crier, &catalog, &config, 10.0, 300.0, &mut rng);
            // carried items always drop, the bell is in always_drop_equipped
            assert!(corpse.inventory.contains(&"moldy_bread".to_string()));
            assert!(corpse.inventory.contains(&"town_crier_bell".to_string()));
            assert_eq!(corpse.decay_at, 310.0);
            assert!(!corpse.skinnable);
            assert_eq!(corpse.name, "corpse of Timothy the Town Crier");
        }
    }

    #[test]
    fn test_corpse_names() {
        assert_eq!(with_article("Giant Rat"), "a Giant Rat");
        assert_eq!(with_article("Orc"), "an Orc");
    }
}
