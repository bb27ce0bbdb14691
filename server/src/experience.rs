//! Field experience pool, absorption and levelling.
//!
//! Defeats feed a bounded pool of unabsorbed experience. Every absorption
//! tick drains part of the pool into permanent XP at a rate that depends on
//! where the player is standing, how sharp their logic is and how full the
//! pool already is.

use mud_shared::{RoomDef, Stat};

use crate::config::ExperienceConfig;
use crate::content::ContentCatalog;
use crate::entities::Player;

/// Shown only when the pool is completely empty
pub const CLEAR_MIND: &str = "clear as a bell";

/// Descending pool-fill thresholds; the first one the ratio reaches wins
const MIND_STATUS: [(f64, &str); 7] = [
    (1.01, "completely saturated"),
    (0.90, "must rest"),
    (0.75, "numbed"),
    (0.62, "becoming numbed"),
    (0.50, "muddled"),
    (0.25, "clear"),
    (0.0, "fresh and clear"),
];

/// Explicit thresholds for the first few levels
const LEVEL_THRESHOLDS: [(u32, i64); 4] = [(2, 100), (3, 300), (4, 600), (5, 1000)];

/// How a room rates for absorption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomCategory {
    Node { super_node: bool },
    Town,
    Other,
}

impl RoomCategory {
    pub fn of(room: Option<&RoomDef>) -> Self {
        match room {
            Some(r) if r.is_node || r.is_super_node => RoomCategory::Node { super_node: r.is_super_node },
            Some(r) if r.is_town => RoomCategory::Town,
            _ => RoomCategory::Other,
        }
    }
}

/// Outcome of adding field XP to a pool
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PoolGain {
    pub added: i64,
    pub lost: i64,
    pub messages: Vec<String>,
}

/// Outcome of one absorption event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Absorption {
    pub absorbed: i64,
    pub levels_gained: u32,
    pub messages: Vec<String>,
}

pub fn pool_capacity(player: &Player, catalog: &ContentCatalog, config: &ExperienceConfig) -> i64 {
    let logic = player.primary_bonus(Stat::Logic, catalog) as i64;
    (config.pool_base_capacity + config.pool_capacity_per_logic_bonus * logic).max(config.pool_min_capacity)
}

/// Add field XP to the pool, losing whatever does not fit
pub fn add_to_pool(player: &mut Player, amount: i64, catalog: &ContentCatalog, config: &ExperienceConfig) -> PoolGain {
    let mut gain = PoolGain::default();
    if amount <= 0 {
        return gain;
    }

    let capacity = pool_capacity(player, catalog, config);
    let space = (capacity - player.unabsorbed_xp).max(0);
    gain.added = amount.min(space);
    gain.lost = amount - gain.added;

    if gain.added > 0 {
        player.unabsorbed_xp += gain.added;
        gain.messages.push(format!("You gain {} experience (to be absorbed).", gain.added));
    }
    if gain.lost > 0 {
        gain.messages.push("Your mind feels too full to absorb all of that experience right now.".to_string());
    }
    if let Some(status) = refresh_mind_status(player, catalog, config, gain.added > 0) {
        gain.messages.push(status);
    }
    gain
}

/// XP drained per absorption event in the given room category
pub fn absorption_amount(
    player: &Player,
    category: RoomCategory,
    catalog: &ContentCatalog,
    config: &ExperienceConfig,
) -> i64 {
    let (base, divisor) = match category {
        RoomCategory::Node { super_node } => {
            let bonus = if super_node { config.super_node_bonus } else { 0 };
            (config.node_base_rate + bonus, config.node_logic_divisor)
        }
        RoomCategory::Town => (config.town_base_rate, config.town_logic_divisor),
        RoomCategory::Other => (config.other_base_rate, config.other_logic_divisor),
    };

    let logic = player.primary_bonus(Stat::Logic, catalog) as i64;
    let logic_contrib = if divisor > 0 { logic.div_euclid(divisor) } else { 0 };

    let pool_bonus = if config.pool_bonus_step > 0 {
        ((player.unabsorbed_xp / config.pool_bonus_step) * config.pool_bonus_per_step).min(config.pool_bonus_cap)
    } else {
        0
    };
    let group = if player.grouped { config.group_bonus } else { 0 };

    (base + logic_contrib + pool_bonus + group).max(config.min_absorb)
}

/// Run one absorption event for a player standing in `room`
pub fn absorb(
    player: &mut Player,
    room: Option<&RoomDef>,
    catalog: &ContentCatalog,
    config: &ExperienceConfig,
) -> Absorption {
    let mut result = Absorption::default();
    if player.unabsorbed_xp <= 0 {
        return result;
    }

    let rate = absorption_amount(player, RoomCategory::of(room), catalog, config);
    let amount = rate.min(player.unabsorbed_xp);
    if amount <= 0 {
        return result;
    }

    player.xp += amount;
    player.unabsorbed_xp -= amount;
    result.absorbed = amount;
    result.messages.push(format!("You feel more experienced (+{} XP).", amount));

    if let Some(status) = refresh_mind_status(player, catalog, config, false) {
        result.messages.push(status);
    }

    while player.xp >= xp_for_level(player.level + 1) {
        level_up(player, catalog, config);
        result.levels_gained += 1;
        result.messages.push(format!("**Congratulations! You have reached level {}!**", player.level));
    }

    result
}

/// Total XP needed to reach `level`
pub fn xp_for_level(level: u32) -> i64 {
    LEVEL_THRESHOLDS
        .iter()
        .find(|(l, _)| *l == level)
        .map(|(_, xp)| *xp)
        .unwrap_or_else(|| {
            let l = level as i64;
            l * l * 100 + 100
        })
}

fn level_up(player: &mut Player, catalog: &ContentCatalog, config: &ExperienceConfig) {
    player.level += 1;
    player.training_points += config.training_points_per_level;

    if !player.racial_training_bonus_granted {
        if let Some(race) = catalog.race(&player.race) {
            player.training_points += race.bonus_training_points;
        }
        player.racial_training_bonus_granted = true;
    }

    player.recompute_derived(catalog);
    player.restore_resources();
}

/// Mind status for the current pool fill
pub fn mind_status(player: &Player, catalog: &ContentCatalog, config: &ExperienceConfig) -> &'static str {
    if player.unabsorbed_xp <= 0 {
        return CLEAR_MIND;
    }
    let capacity = pool_capacity(player, catalog, config);
    let ratio = player.unabsorbed_xp as f64 / capacity as f64;
    MIND_STATUS
        .iter()
        .find(|(threshold, _)| ratio >= *threshold)
        .map(|(_, status)| *status)
        .unwrap_or(CLEAR_MIND)
}

/// Record the current status and return the notice if it changed
fn refresh_mind_status(
    player: &mut Player,
    catalog: &ContentCatalog,
    config: &ExperienceConfig,
    force: bool,
) -> Option<String> {
    let status = mind_status(player, catalog, config);
    if !force && player.mind_status == Some(status) {
        return None;
    }
    player.mind_status = Some(status);
    Some(format!("Mind state: {}.", status))
}
