//! Melee combat resolution.
//!
//! Each attack is resolved on its own: attack strength against defense
//! strength, a d100 roll, and damage scaled by how far the roll cleared the
//! hit threshold. Nothing carries over between swings except the target's HP.

use std::collections::HashMap;
use rand::Rng;

use mud_shared::{EntityTemplate, ItemTemplate, Stat, StatBlock, UNARMORED};

use crate::config::CombatConfig;
use crate::content::ContentCatalog;
use crate::entities::{EntityRuntime, EquipmentHolder, Player};
use crate::rules::{floor_div, roll, skill_bonus, stat_bonus};

/// The parts of a combatant that combat reads
pub struct Fighter<'a> {
    pub name: &'a str,
    pub stats: &'a StatBlock,
    pub skills: &'a HashMap<String, i32>,
    pub gear: &'a dyn EquipmentHolder,
    /// Claws and teeth: damage dice used when no weapon is held
    pub natural_damage: Option<&'a str>,
}

impl<'a> Fighter<'a> {
    pub fn player(player: &'a Player) -> Self {
        Self {
            name: &player.name,
            stats: &player.stats,
            skills: &player.skills,
            gear: player,
            natural_damage: None,
        }
    }

    pub fn entity(runtime: &'a EntityRuntime, template: &'a EntityTemplate) -> Self {
        Self {
            name: &runtime.name,
            stats: &template.stats,
            skills: &template.skills,
            gear: runtime,
            natural_damage: Some(&template.attack_damage),
        }
    }

    fn skill_rank(&self, skill: &str) -> i32 {
        self.skills.get(skill).copied().unwrap_or(0)
    }
}

/// Everything computed for one swing
#[derive(Debug, Clone, PartialEq)]
pub struct Swing {
    pub attack_strength: i32,
    pub defense_strength: i32,
    pub defender_armor: String,
    pub d100: i32,
    pub result: i32,
    pub hit: bool,
    pub damage: i32,
    /// Weapon name, or `None` when barehanded
    pub weapon: Option<String>,
}

/// Outcome of an attack against an entity
#[derive(Debug, Clone, PartialEq)]
pub struct AttackOutcome {
    /// `None` when the target was already defeated and nothing was rolled
    pub swing: Option<Swing>,
    pub already_defeated: bool,
    pub damage: i32,
    pub remaining_hp: i32,
    /// Set on exactly one attack per life: the one that defeated the target
    pub defeated: bool,
}

/// Outcome of an entity's attack on a player
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStrike {
    /// `None` when the player was already down and nothing was rolled
    pub swing: Option<Swing>,
    pub damage: i32,
    pub remaining_hp: i32,
    /// Set only by the blow that took the player from above zero to zero
    pub defeated: bool,
}

impl AttackOutcome {
    pub fn hit(&self) -> bool {
        self.swing.as_ref().map(|s| s.hit).unwrap_or(false)
    }
}

/// AS modifier a weapon gets against an armor type
fn armor_modifier(weapon: &ItemTemplate, armor_type: &str) -> i32 {
    weapon
        .avd_modifiers
        .get(armor_type)
        .or_else(|| weapon.avd_modifiers.get(UNARMORED))
        .copied()
        .unwrap_or(0)
}

/// Attack strength against a defender wearing `defender_armor`
pub fn attack_strength(
    attacker: &Fighter,
    defender_armor: &str,
    catalog: &ContentCatalog,
    config: &CombatConfig,
) -> i32 {
    let strength = stat_bonus(attacker.stats.get(Stat::Strength), config.stat_baseline, config.strength_as_divisor);

    match attacker.gear.weapon(catalog) {
        Some(weapon) => {
            let skill = weapon.skill.as_deref().unwrap_or(&config.barehanded_skill);
            strength
                + skill_bonus(attacker.skill_rank(skill), config.weapon_skill_as_divisor)
                + weapon.weapon_as_bonus
                + weapon.enchantment_as_bonus
                + armor_modifier(weapon, defender_armor)
        }
        None => {
            strength
                + skill_bonus(attacker.skill_rank(&config.barehanded_skill), config.weapon_skill_as_divisor)
                + config.barehanded_base_as
        }
    }
}

/// Defense strength from agility, body armor and shield
pub fn defense_strength(defender: &Fighter, catalog: &ContentCatalog, config: &CombatConfig) -> i32 {
    let agility = stat_bonus(defender.stats.get(Stat::Agility), config.stat_baseline, config.agility_ds_divisor);

    let armor = match defender.gear.body_armor(catalog) {
        Some(armor) => armor.armor_ds_bonus + armor.enchantment_ds_bonus,
        None => config.unarmored_base_ds,
    };

    let shield = match defender.gear.shield(catalog) {
        Some(shield) => {
            shield.shield_ds_bonus
                + shield.enchantment_ds_bonus
                + skill_bonus(defender.skill_rank(&config.shield_skill), config.shield_skill_ds_divisor)
        }
        None => 0,
    };

    agility + armor + shield
}

/// Damage for a hit: the weapon roll plus one point per divisor step cleared
pub fn hit_damage(result: i32, weapon_roll: i32, config: &CombatConfig) -> i32 {
    let margin = (result - config.hit_threshold).max(0);
    let scaled = if config.damage_divisor == 0 {
        0
    } else {
        floor_div(margin, config.damage_divisor)
    };
    weapon_roll.saturating_add(scaled).max(1)
}

/// Resolve one swing with a given d100; damage dice are drawn from `rng`
pub fn swing<R: Rng + ?Sized>(
    attacker: &Fighter,
    defender: &Fighter,
    catalog: &ContentCatalog,
    config: &CombatConfig,
    d100: i32,
    rng: &mut R,
) -> Swing {
    let defender_armor = defender.gear.armor_type(catalog);
    let attack_strength = attack_strength(attacker, &defender_armor, catalog, config);
    let defense_strength = defense_strength(defender, catalog, config);

    let result = (attack_strength - defense_strength) + config.advantage + d100;
    let hit = result > config.hit_threshold;

    let weapon = attacker.gear.weapon(catalog);
    let damage = if hit {
        let dice = weapon
            .and_then(|w| w.damage.as_deref())
            .or(attacker.natural_damage)
            .unwrap_or(&config.barehanded_damage);
        hit_damage(result, roll(dice, rng), config)
    } else {
        0
    };

    Swing {
        attack_strength,
        defense_strength,
        defender_armor,
        d100,
        result,
        hit,
        damage,
        weapon: weapon.map(|w| w.name.clone()),
    }
}

/// Attack a spawned entity, applying damage to its runtime record.
///
/// A target that is already defeated short-circuits before any rolls.
pub fn resolve_attack<R: Rng + ?Sized>(
    attacker: &Fighter,
    target: &mut EntityRuntime,
    template: &EntityTemplate,
    catalog: &ContentCatalog,
    config: &CombatConfig,
    now: f64,
    rng: &mut R,
) -> AttackOutcome {
    if target.is_defeated() {
        return AttackOutcome {
            swing: None,
            already_defeated: true,
            damage: 0,
            remaining_hp: target.hp().unwrap_or(0),
            defeated: false,
        };
    }

    let d100 = rng.gen_range(1..=100);
    let result = {
        let defender = Fighter::entity(target, template);
        swing(attacker, &defender, catalog, config, d100, rng)
    };

    if !result.hit {
        return AttackOutcome {
            damage: 0,
            remaining_hp: target.hp().unwrap_or(template.max_hp),
            swing: Some(result),
            already_defeated: false,
            defeated: false,
        };
    }

    let applied = target.apply_damage(result.damage, template.max_hp, now);
    AttackOutcome {
        damage: result.damage,
        remaining_hp: applied.remaining_hp,
        swing: Some(result),
        already_defeated: false,
        defeated: applied.defeated,
    }
}

/// Attack a player, applying damage to their HP
pub fn resolve_attack_on_player<R: Rng + ?Sized>(
    attacker: &Fighter,
    target: &mut Player,
    catalog: &ContentCatalog,
    config: &CombatConfig,
    rng: &mut R,
) -> PlayerStrike {
    if target.hp <= 0 {
        return PlayerStrike { swing: None, damage: 0, remaining_hp: target.hp, defeated: false };
    }

    let d100 = rng.gen_range(1..=100);
    let result = swing(attacker, &Fighter::player(target), catalog, config, d100, rng);
    let defeated = result.hit && target.take_damage(result.damage);
    PlayerStrike {
        damage: result.damage,
        remaining_hp: target.hp,
        swing: Some(result),
        defeated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mud_shared::{EquipSlot, ItemType};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use crate::entities::equip;
    use crate::entities::player::tests::test_player;

    fn practice_blade() -> ItemTemplate {
        ItemTemplate {
            id: "practice_blade".into(),
            name: "Practice Blade".into(),
            item_type: ItemType::Weapon,
            slots: vec!["mainhand".into()],
            skill: Some("edged_weapons".into()),
            damage: Some("1d4".into()),
            weapon_as_bonus: -2,
            ..Default::default()
        }
    }

    fn defender_template(agility: i32) -> EntityTemplate {
        EntityTemplate {
            key: "sparring_partner".into(),
            name: "Sparring Partner".into(),
            max_hp: 50,
            stats: StatBlock::uniform(50).with(Stat::Agility, agility),
            ..Default::default()
        }
    }

    fn armed_player(catalog: &ContentCatalog, strength: i32) -> Player {
        let mut player = test_player(catalog);
        player.stats.set(Stat::Strength, strength);
        player.add_item("practice_blade");
        equip(&mut player, "practice_blade", EquipSlot::Mainhand, catalog).unwrap();
        player
    }

    fn catalog_with_blade() -> ContentCatalog {
        let mut catalog = ContentCatalog::with_defaults();
        catalog.insert_item(practice_blade());
        catalog
    }

    #[test]
    fn test_reference_swing() {
        let catalog = catalog_with_blade();
        let config = CombatConfig::default();
        let player = armed_player(&catalog, 70);
        let template = defender_template(50);
        let target = EntityRuntime::spawn(&template, &catalog);

        let attacker = Fighter::player(&player);
        let defender = Fighter::entity(&target, &template);
        let mut rng = StdRng::seed_from_u64(7);
        let s = swing(&attacker, &defender, &catalog, &config, 80, &mut rng);

        // AS = 1 (str) + 0 (skill) - 2 (weapon), DS = 0, 119 = -1 + 40 + 80
        assert_eq!(s.attack_strength, -1);
        assert_eq!(s.defense_strength, 0);
        assert_eq!(s.defender_armor, UNARMORED);
        assert_eq!(s.result, 119);
        assert!(s.hit);
        // 1d4 + floor(119 / 10)
        assert!((12..=15).contains(&s.damage), "damage {}", s.damage);
        assert_eq!(hit_damage(s.result, 3, &config), 14);
    }

    #[test]
    fn test_armor_type_modifier_applies() {
        let catalog = ContentCatalog::with_defaults();
        let config = CombatConfig::default();
        let mut player = test_player(&catalog);
        player.stats.set(Stat::Strength, 70);
        player.add_item("rusty_sword");
        equip(&mut player, "rusty_sword", EquipSlot::Mainhand, &catalog).unwrap();
        let template = defender_template(50);
        let target = EntityRuntime::spawn(&template, &catalog);

        let attacker = Fighter::player(&player);
        let defender = Fighter::entity(&target, &template);
        // rusty sword carries +5 against unarmored
        assert_eq!(attack_strength(&attacker, UNARMORED, &catalog, &config), 4);
        assert_eq!(attack_strength(&attacker, "plate", &catalog, &config), -11);
        // unknown armor types fall back to the unarmored entry
        assert_eq!(attack_strength(&attacker, "dragonhide", &catalog, &config), 4);
        assert_eq!(defense_strength(&defender, &catalog, &config), 0);
    }

    #[test]
    fn test_body_armor_and_shield_add_defense() {
        let catalog = ContentCatalog::with_defaults();
        let config = CombatConfig::default();
        let mut player = test_player(&catalog);
        player.stats.set(Stat::Agility, 50);
        player.skills.insert("shield_use".into(), 25);
        for item in ["old_tunic", "wooden_buckler"] {
            player.add_item(item);
        }
        equip(&mut player, "old_tunic", EquipSlot::Torso, &catalog).unwrap();
        equip(&mut player, "wooden_buckler", EquipSlot::Offhand, &catalog).unwrap();

        let defender = Fighter::player(&player);
        // 0 agility + 3 tunic + 5 buckler + 2 shield skill
        assert_eq!(defense_strength(&defender, &catalog, &config), 10);
        assert_eq!(player.armor_type(&catalog), "cloth");
    }

    #[test]
    fn test_barehanded_uses_flat_damage() {
        let catalog = ContentCatalog::with_defaults();
        let config = CombatConfig::default();
        let player = test_player(&catalog);
        let template = defender_template(50);
        let target = EntityRuntime::spawn(&template, &catalog);
        let mut rng = StdRng::seed_from_u64(3);

        let s = swing(&Fighter::player(&player), &Fighter::entity(&target, &template), &catalog, &config, 50, &mut rng);
        // str 10: floor(-40 / 20) = -2
        assert_eq!(s.attack_strength, -2);
        assert_eq!(s.weapon, None);
        assert_eq!(s.result, 88);
        assert_eq!(s.damage, 1 + 8);
    }

    #[test]
    fn test_miss_deals_nothing() {
        let catalog = ContentCatalog::with_defaults();
        let config = CombatConfig::default();
        let player = test_player(&catalog);
        let template = defender_template(500);
        let target = EntityRuntime::spawn(&template, &catalog);
        let mut rng = StdRng::seed_from_u64(3);

        let s = swing(&Fighter::player(&player), &Fighter::entity(&target, &template), &catalog, &config, 1, &mut rng);
        // -2 - 45 + 40 + 1
        assert_eq!(s.result, -6);
        assert!(!s.hit);
        assert_eq!(s.damage, 0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let config = CombatConfig::default();
        let catalog = ContentCatalog::with_defaults();
        let player = test_player(&catalog);
        // agility 470 gives DS 42; -2 - 42 + 40 + 4 == 0
        let template = defender_template(470);
        let target = EntityRuntime::spawn(&template, &catalog);
        let mut rng = StdRng::seed_from_u64(3);
        let s = swing(&Fighter::player(&player), &Fighter::entity(&target, &template), &catalog, &config, 4, &mut rng);
        assert_eq!(s.result, 0);
        assert!(!s.hit);
    }

    #[test]
    fn test_damage_is_at_least_one() {
        let config = CombatConfig::default();
        assert_eq!(hit_damage(1, -10, &config), 1);
        assert_eq!(hit_damage(5, 0, &config), 1);
        // an absurd weapon roll saturates instead of overflowing
        assert_eq!(hit_damage(119, i32::MAX, &config), i32::MAX);

        let catalog = catalog_with_blade();
        let player = armed_player(&catalog, 10);
        let template = defender_template(50);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let mut target = EntityRuntime::spawn(&template, &catalog);
            let outcome = resolve_attack(&Fighter::player(&player), &mut target, &template, &catalog, &config, 0.0, &mut rng);
            if outcome.hit() {
                assert!(outcome.damage >= 1);
            }
        }
    }

    #[test]
    fn test_attack_on_defeated_target_is_noop() {
        let catalog = catalog_with_blade();
        let config = CombatConfig::default();
        let player = armed_player(&catalog, 70);
        let mut template = defender_template(50);
        template.max_hp = 1;
        let mut target = EntityRuntime::spawn(&template, &catalog);
        let mut rng = StdRng::seed_from_u64(5);

        let mut first = resolve_attack(&Fighter::player(&player), &mut target, &template, &catalog, &config, 1.0, &mut rng);
        while !first.defeated {
            first = resolve_attack(&Fighter::player(&player), &mut target, &template, &catalog, &config, 1.0, &mut rng);
        }
        assert!(target.is_defeated());

        let second = resolve_attack(&Fighter::player(&player), &mut target, &template, &catalog, &config, 2.0, &mut rng);
        assert!(second.already_defeated);
        assert_eq!(second.damage, 0);
        assert!(!second.defeated);
        assert!(second.swing.is_none());
    }

    #[test]
    fn test_entity_uses_natural_weapons() {
        let catalog = ContentCatalog::with_defaults();
        let config = CombatConfig::default();
        let mut template = defender_template(50);
        template.attack_damage = "2d1".into();
        let attacker = EntityRuntime::spawn(&template, &catalog);
        let player = test_player(&catalog);
        let mut rng = StdRng::seed_from_u64(1);

        let s = swing(&Fighter::entity(&attacker, &template), &Fighter::player(&player), &catalog, &config, 50, &mut rng);
        assert!(s.hit);
        assert_eq!(s.weapon, None);
        // 2 from the claws plus floor(result / 10)
        assert_eq!(s.damage, 2 + s.result / 10);
    }

    #[test]
    fn test_player_defeated_once() {
        let catalog = ContentCatalog::with_defaults();
        let config = CombatConfig::default();
        let mut template = defender_template(50);
        template.stats = StatBlock::uniform(100);
        template.attack_damage = "10d10".into();
        let attacker = EntityRuntime::spawn(&template, &catalog);
        let mut player = test_player(&catalog);
        player.hp = 3;
        let mut rng = StdRng::seed_from_u64(21);

        let fighter = Fighter::entity(&attacker, &template);
        let mut strike = resolve_attack_on_player(&fighter, &mut player, &catalog, &config, &mut rng);
        while !strike.defeated {
            assert!(!strike.swing.as_ref().map(|s| s.hit).unwrap_or(false));
            strike = resolve_attack_on_player(&fighter, &mut player, &catalog, &config, &mut rng);
        }
        assert_eq!(player.hp, 0);
        assert_eq!(strike.remaining_hp, 0);

        let after = resolve_attack_on_player(&fighter, &mut player, &catalog, &config, &mut rng);
        assert!(after.swing.is_none());
        assert!(!after.defeated);
        assert_eq!(after.damage, 0);
    }

    #[test]
    fn test_hp_initialised_lazily_from_template() {
        let catalog = catalog_with_blade();
        let config = CombatConfig::default();
        let player = armed_player(&catalog, 70);
        let template = defender_template(50);
        let mut target = EntityRuntime::spawn(&template, &catalog);
        assert_eq!(target.hp(), None);

        let mut rng = StdRng::seed_from_u64(9);
        let outcome = resolve_attack(&Fighter::player(&player), &mut target, &template, &catalog, &config, 0.0, &mut rng);
        assert!(outcome.hit());
        assert_eq!(target.hp(), Some(template.max_hp - outcome.damage));
    }
}
