//! Player command handlers.
//!
//! Every handler runs inside the tick, against the world the scheduler owns.
//! Handlers queue their own narration and report how long the player must
//! wait before acting again.

use log::warn;
use rand::Rng;

use mud_shared::{Disposition, EquipSlot, MessageType, PlayerCommand, PlayerId, RoomId};

use crate::aggression;
use crate::combat::{resolve_attack, Fighter};
use crate::entities::{equip, unequip, EquipError, EquipmentHolder, Player, RuntimeHandle};
use crate::experience;
use crate::loot;
use crate::scheduler::Outbox;
use crate::world::{GameWorld, RoomState};

/// Result of executing a command
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandResult {
    /// Whether the command did what was asked
    pub success: bool,
    /// Seconds before the player may act again
    pub roundtime: f64,
}

impl CommandResult {
    pub fn success(roundtime: f64) -> Self {
        Self { success: true, roundtime }
    }

    pub fn error(roundtime: f64) -> Self {
        Self { success: false, roundtime }
    }
}

/// Parse and execute one command for a connected player
pub fn execute<R: Rng + ?Sized>(
    world: &mut GameWorld,
    outbox: &mut Outbox,
    command: &PlayerCommand,
    now: f64,
    rng: &mut R,
) -> CommandResult {
    let player_id = command.player_id;
    let target = command.target.as_str();

    if let Some(direction) = expand_direction(&command.verb) {
        return cmd_move(world, outbox, player_id, direction);
    }

    match command.verb.as_str() {
        "attack" | "kill" | "a" => cmd_attack(world, outbox, player_id, target, now, rng),
        "look" | "l" => cmd_look(world, outbox, player_id, target),
        "go" | "move" => match expand_direction(target) {
            Some(direction) => cmd_move(world, outbox, player_id, direction),
            None => {
                outbox.error(player_id, "Go where?");
                CommandResult::error(world.config.round_times.look)
            }
        },
        "equip" | "wield" | "wear" => cmd_equip(world, outbox, player_id, target),
        "unequip" | "remove" => cmd_unequip(world, outbox, player_id, target),
        "search" => cmd_search(world, outbox, player_id, target),
        "skin" => cmd_skin(world, outbox, player_id, target),
        "inventory" | "inv" | "i" => cmd_inventory(world, outbox, player_id),
        "help" => cmd_help(outbox, player_id),
        "" => CommandResult::error(0.0),
        other => {
            outbox.error(player_id, format!("Unknown command: {}", other));
            CommandResult::error(0.0)
        }
    }
}

fn expand_direction(word: &str) -> Option<&'static str> {
    let direction = match word.trim().to_ascii_lowercase().as_str() {
        "n" | "north" => "north",
        "s" | "south" => "south",
        "e" | "east" => "east",
        "w" | "west" => "west",
        "ne" | "northeast" => "northeast",
        "nw" | "northwest" => "northwest",
        "se" | "southeast" => "southeast",
        "sw" | "southwest" => "southwest",
        "u" | "up" => "up",
        "d" | "down" => "down",
        "out" => "out",
        _ => return None,
    };
    Some(direction)
}

// =============================================================================
// Combat
// =============================================================================

fn cmd_attack<R: Rng + ?Sized>(
    world: &mut GameWorld,
    outbox: &mut Outbox,
    player_id: PlayerId,
    target: &str,
    now: f64,
    rng: &mut R,
) -> CommandResult {
    let round_times = world.config.round_times.clone();
    if target.is_empty() {
        outbox.error(player_id, "Attack what?");
        return CommandResult::error(round_times.look);
    }
    let Some(room_id) = world.get_player(player_id).map(|p| p.room_id) else {
        return CommandResult::error(0.0);
    };
    let Some(handle) = world
        .rooms
        .get(&room_id)
        .and_then(|room| room.find_entity(target, &world.catalog))
    else {
        outbox.error(player_id, format!("You don't see '{}' here.", target));
        return CommandResult::error(round_times.look);
    };

    let (outcome, template_key, target_name, attacker_name) = {
        let GameWorld { catalog, config, rooms, players, .. } = &mut *world;
        let (Some(player), Some(room)) = (players.get(&player_id), rooms.get_mut(&room_id)) else {
            return CommandResult::error(0.0);
        };
        let Some(runtime) = room.entities.get_mut(handle) else {
            return CommandResult::error(round_times.look);
        };
        let Some(template) = catalog.entity(&runtime.template_key) else {
            warn!("Entity in room {} has unknown template '{}'", room_id, runtime.template_key);
            outbox.error(player_id, "You can't attack that.");
            return CommandResult::error(round_times.look);
        };
        let outcome = resolve_attack(&Fighter::player(player), runtime, template, catalog, &config.combat, now, rng);
        (outcome, template.key.clone(), runtime.name.clone(), player.name.clone())
    };

    let Some(swing) = &outcome.swing else {
        outbox.error(player_id, format!("The {} is already defeated.", target_name));
        return CommandResult::error(round_times.look);
    };

    let weapon = swing.weapon.as_deref().unwrap_or("fists");
    let mut line = format!(
        "You swing your {} at the {}! AS: {} vs DS: {} with d100 roll {} = {}.",
        weapon, target_name, swing.attack_strength, swing.defense_strength, swing.d100, swing.result
    );
    if swing.hit {
        line.push_str(&format!(" You hit for {} damage!", swing.damage));
    } else {
        line.push_str(" A clean miss.");
    }
    outbox.push(player_id, MessageType::Combat, line);

    let witnesses = world.players_in_room(room_id);
    let seen = if swing.hit {
        format!("{} strikes the {}!", attacker_name, target_name)
    } else {
        format!("{} swings at the {} and misses.", attacker_name, target_name)
    };
    outbox.broadcast(&witnesses, Some(player_id), MessageType::Combat, &seen);

    if outcome.defeated {
        handle_defeat(world, outbox, player_id, room_id, handle, &template_key, now, rng);
    } else {
        provoke(world, outbox, player_id, handle, &template_key, now, rng);
    }

    CommandResult::success(round_times.attack)
}

/// Anything but a passive entity fights back once swung at
fn provoke<R: Rng + ?Sized>(
    world: &mut GameWorld,
    outbox: &mut Outbox,
    player_id: PlayerId,
    handle: RuntimeHandle,
    template_key: &str,
    now: f64,
    rng: &mut R,
) {
    let Some(template) = world.catalog.entity(template_key) else {
        return;
    };
    if template.disposition == Disposition::Passive {
        return;
    }
    let first_swing_at = now + aggression::swing_delay(template, &world.config.aggression, rng);
    let Some(subject) = world
        .rooms
        .get(&handle.room)
        .and_then(|room| room.entities.get(handle))
        .map(aggression::subject)
    else {
        return;
    };
    if !world.aggression.provoke(handle, player_id, first_swing_at) {
        return;
    }

    let attacker = world.get_player(player_id).map(|p| p.name.clone()).unwrap_or_default();
    let witnesses = world.players_in_room(handle.room);
    outbox.push(player_id, MessageType::Combat, format!("{} becomes enraged by your attack!", subject));
    outbox.broadcast(
        &witnesses,
        Some(player_id),
        MessageType::Combat,
        &format!("{} flies into a rage at {}!", subject, attacker),
    );
}

/// Award and clean up after a kill: XP, faction, respawn tracking and the corpse
#[allow(clippy::too_many_arguments)]
fn handle_defeat<R: Rng + ?Sized>(
    world: &mut GameWorld,
    outbox: &mut Outbox,
    player_id: PlayerId,
    room_id: RoomId,
    handle: RuntimeHandle,
    template_key: &str,
    now: f64,
    rng: &mut R,
) {
    world.aggression.release(handle);
    let Some(leaves_corpse) = world.catalog.entity(template_key).map(|t| t.leaves_corpse) else {
        return;
    };
    let corpse_id = leaves_corpse.then(|| world.allocate_corpse_id());
    let witnesses = world.players_in_room(room_id);

    let GameWorld { catalog, config, rooms, players, respawns, .. } = &mut *world;
    let Some(template) = catalog.entity(template_key) else {
        return;
    };

    let fallen = format!("The {} has been defeated!", template.name);
    outbox.broadcast(&witnesses, None, MessageType::Combat, &fallen);

    if let Some(player) = players.get_mut(&player_id) {
        let gain = experience::add_to_pool(player, template.xp_value, catalog, &config.experience);
        for message in gain.messages {
            outbox.push(player_id, MessageType::Experience, message);
        }
        for hit in &template.faction_hits_on_kill {
            if let Some(message) = player.adjust_faction(&hit.faction, hit.amount, config.player.faction_limit) {
                outbox.info(player_id, message);
            }
        }
    }

    respawns.register(handle, template, now);

    let (Some(corpse_id), Some(room)) = (corpse_id, rooms.get_mut(&room_id)) else {
        return;
    };
    if let Some(runtime) = room.entities.get(handle) {
        let corpse = loot::assemble_corpse(
            corpse_id,
            runtime,
            template,
            catalog,
            &config.loot,
            now,
            config.lifecycle.corpse_decay_secs,
            rng,
        );
        room.corpses.insert(corpse_id, corpse);
    }
}

// =============================================================================
// Movement and looking
// =============================================================================

fn cmd_move(world: &mut GameWorld, outbox: &mut Outbox, player_id: PlayerId, direction: &str) -> CommandResult {
    let round_times = world.config.round_times.clone();
    let Some(player) = world.get_player(player_id) else {
        return CommandResult::error(0.0);
    };
    let from = player.room_id;
    let name = player.name.clone();

    let destination = world
        .catalog
        .room(from)
        .and_then(|room| room.exits.get(direction))
        .copied();
    let Some(destination) = destination.filter(|id| world.rooms.contains_key(id)) else {
        if let Some(id) = destination {
            warn!("Room {} has an exit to missing room {}", from, id);
        }
        outbox.error(player_id, "You can't go that way.");
        return CommandResult::error(round_times.look);
    };

    let left_behind = world.players_in_room(from);
    outbox.broadcast(&left_behind, Some(player_id), MessageType::Room, &format!("{} goes {}.", name, direction));

    if let Some(player) = world.get_player_mut(player_id) {
        player.room_id = destination;
    }

    let arrivals = world.players_in_room(destination);
    outbox.broadcast(&arrivals, Some(player_id), MessageType::Room, &format!("{} arrives.", name));
    outbox.push(player_id, MessageType::Room, world.describe_room(destination, player_id));

    CommandResult::success(round_times.movement)
}

fn cmd_look(world: &mut GameWorld, outbox: &mut Outbox, player_id: PlayerId, target: &str) -> CommandResult {
    let look = world.config.round_times.look;
    let Some(player) = world.get_player(player_id) else {
        return CommandResult::error(0.0);
    };
    let room_id = player.room_id;

    if target.is_empty() {
        outbox.push(player_id, MessageType::Room, world.describe_room(room_id, player_id));
        return CommandResult::success(look);
    }

    let catalog = &world.catalog;
    if let Some(room) = world.rooms.get(&room_id) {
        if let Some(entity) = room.find_entity(target, catalog).and_then(|h| room.entities.get(h)) {
            let description = catalog
                .entity(&entity.template_key)
                .map(|t| t.description.clone())
                .unwrap_or_default();
            let mut text = format!("{}\n{}", entity.name, description);
            if entity.is_defeated() {
                text.push_str("\nIt lies motionless.");
            }
            outbox.info(player_id, text);
            return CommandResult::success(look);
        }

        if let Some(corpse) = room.find_corpse(target).and_then(|id| room.corpses.get(&id)) {
            let state = if corpse.searched { "It has been searched." } else { "It has not been searched." };
            outbox.info(player_id, format!("You see the {}. {}", corpse.name, state));
            return CommandResult::success(look);
        }
    }

    let owned = player
        .find_in_inventory(target, catalog)
        .or_else(|| player.find_equipped(target, catalog));
    if let Some(item) = owned.as_deref().and_then(|id| catalog.item(id)) {
        outbox.info(player_id, format!("{}\n{}", item.name, item.description));
        return CommandResult::success(look);
    }

    outbox.error(player_id, format!("You don't see '{}' here.", target));
    CommandResult::error(look)
}

// =============================================================================
// Equipment and inventory
// =============================================================================

fn cmd_equip(world: &mut GameWorld, outbox: &mut Outbox, player_id: PlayerId, target: &str) -> CommandResult {
    let round_times = world.config.round_times.clone();
    if target.is_empty() {
        outbox.error(player_id, "Equip what?");
        return CommandResult::error(round_times.look);
    }

    // "equip sword mainhand" names the slot last
    let words: Vec<&str> = target.split_whitespace().collect();
    let (item_word, slot) = match words.split_last() {
        Some((last, rest)) if !rest.is_empty() => match EquipSlot::from_name(last) {
            Some(slot) => (rest.join(" "), Some(slot)),
            None => (target.to_string(), None),
        },
        _ => (target.to_string(), None),
    };

    let GameWorld { catalog, players, .. } = &mut *world;
    let Some(player) = players.get_mut(&player_id) else {
        return CommandResult::error(0.0);
    };
    let Some(item_id) = player.find_in_inventory(&item_word, catalog) else {
        outbox.error(player_id, EquipError::NotOwned(item_word).to_string());
        return CommandResult::error(round_times.look);
    };
    let Some(slot) = slot.or_else(|| catalog.item(&item_id).and_then(|i| i.allowed_slots().first().copied())) else {
        outbox.error(player_id, "You can't equip that.");
        return CommandResult::error(round_times.look);
    };

    match equip(player, &item_id, slot, catalog) {
        Ok(outcome) => {
            for line in outcome.narration {
                outbox.info(player_id, line);
            }
            outbox.info(
                player_id,
                format!("You equip the {} to your {}.", catalog.item_name(&item_id), slot.name()),
            );
            CommandResult::success(round_times.short_action)
        }
        Err(e) => {
            outbox.error(player_id, e.to_string());
            CommandResult::error(round_times.look)
        }
    }
}

fn cmd_unequip(world: &mut GameWorld, outbox: &mut Outbox, player_id: PlayerId, target: &str) -> CommandResult {
    let round_times = world.config.round_times.clone();
    if target.is_empty() {
        outbox.error(player_id, "Unequip what?");
        return CommandResult::error(round_times.look);
    }

    let GameWorld { catalog, players, .. } = &mut *world;
    let Some(player) = players.get_mut(&player_id) else {
        return CommandResult::error(0.0);
    };
    let slot = EquipSlot::from_name(target).or_else(|| {
        player
            .find_equipped(target, catalog)
            .and_then(|id| player.equipment.slot_of(&id))
    });
    let Some(slot) = slot else {
        outbox.error(player_id, EquipError::InvalidSlot(target.to_string()).to_string());
        return CommandResult::error(round_times.look);
    };

    match unequip(player, slot, catalog) {
        Ok(item_id) => {
            outbox.info(player_id, format!("You remove your {}.", catalog.item_name(&item_id)));
            CommandResult::success(round_times.short_action)
        }
        Err(e) => {
            outbox.error(player_id, e.to_string());
            CommandResult::error(round_times.look)
        }
    }
}

fn cmd_inventory(world: &mut GameWorld, outbox: &mut Outbox, player_id: PlayerId) -> CommandResult {
    let Some(player) = world.get_player(player_id) else {
        return CommandResult::error(0.0);
    };
    let catalog = &world.catalog;

    let mut lines = Vec::new();
    if player.inventory.is_empty() {
        lines.push("You are carrying nothing.".to_string());
    } else {
        let names: Vec<&str> = player.inventory.iter().map(|id| catalog.item_name(id)).collect();
        lines.push(format!(
            "You are carrying ({}/{}): {}.",
            player.inventory.len(),
            player.inventory_capacity,
            names.join(", ")
        ));
    }

    let worn: Vec<String> = player
        .equipment()
        .iter()
        .map(|(slot, id)| format!("{}: {}", slot.name(), catalog.item_name(id)))
        .collect();
    if !worn.is_empty() {
        lines.push(format!("You are wearing: {}.", worn.join(", ")));
    }
    lines.push(format!("You have {} gold.", player.gold));

    outbox.info(player_id, lines.join("\n"));
    CommandResult::success(0.0)
}

// =============================================================================
// Corpses
// =============================================================================

/// Give an item to the player, or drop it on the floor if their pack is full
fn give_or_drop(player: &mut Player, room: &mut RoomState, item_id: &str, name: &str, outbox: &mut Outbox) {
    if player.add_item(item_id) {
        outbox.push(player.id, MessageType::Loot, format!("You get {}.", name));
    } else {
        room.ground_items.push(item_id.to_string());
        outbox.push(
            player.id,
            MessageType::Loot,
            format!("Your pack is full; {} falls to the ground.", name),
        );
    }
}

fn corpse_word(target: &str) -> &str {
    if target.is_empty() {
        "corpse"
    } else {
        target
    }
}

fn cmd_search(world: &mut GameWorld, outbox: &mut Outbox, player_id: PlayerId, target: &str) -> CommandResult {
    let round_times = world.config.round_times.clone();
    let GameWorld { catalog, players, rooms, .. } = &mut *world;
    let Some(player) = players.get_mut(&player_id) else {
        return CommandResult::error(0.0);
    };
    let Some(room) = rooms.get_mut(&player.room_id) else {
        return CommandResult::error(0.0);
    };
    let word = corpse_word(target);
    let Some(corpse_id) = room.find_corpse(word) else {
        outbox.error(player_id, format!("You don't see '{}' here.", word));
        return CommandResult::error(round_times.look);
    };
    let Some(corpse) = room.corpses.get_mut(&corpse_id) else {
        return CommandResult::error(round_times.look);
    };

    let corpse_name = corpse.name.clone();
    let items = std::mem::take(&mut corpse.inventory);
    let gold = std::mem::take(&mut corpse.gold);
    corpse.searched = true;
    let exhausted = corpse.is_exhausted();

    if items.is_empty() && gold == 0 {
        outbox.info(player_id, format!("You search the {} but find nothing of value.", corpse_name));
    } else {
        outbox.info(player_id, format!("You search the {}.", corpse_name));
    }
    for item_id in &items {
        give_or_drop(player, room, item_id, catalog.item_name(item_id), outbox);
    }
    if gold > 0 {
        player.gold += gold as u64;
        outbox.push(player_id, MessageType::Loot, format!("You find {} gold coins.", gold));
    }

    if exhausted {
        room.corpses.remove(&corpse_id);
        outbox.info(player_id, format!("Nothing useful remains of the {}.", corpse_name));
    }

    CommandResult::success(round_times.short_action)
}

fn cmd_skin(world: &mut GameWorld, outbox: &mut Outbox, player_id: PlayerId, target: &str) -> CommandResult {
    let round_times = world.config.round_times.clone();
    let GameWorld { catalog, players, rooms, .. } = &mut *world;
    let Some(player) = players.get_mut(&player_id) else {
        return CommandResult::error(0.0);
    };
    let Some(room) = rooms.get_mut(&player.room_id) else {
        return CommandResult::error(0.0);
    };
    let word = corpse_word(target);
    let Some(corpse_id) = room.find_corpse(word) else {
        outbox.error(player_id, format!("You don't see '{}' here.", word));
        return CommandResult::error(round_times.look);
    };
    let Some(corpse) = room.corpses.get_mut(&corpse_id) else {
        return CommandResult::error(round_times.look);
    };

    let template = catalog.entity(&corpse.template_key);
    let result = loot::skin_corpse(corpse, template, |skill| player.skill_rank(skill), catalog);
    let corpse_name = corpse.name.clone();
    let exhausted = corpse.is_exhausted();

    let items = match result {
        Ok(items) => items,
        Err(e) => {
            outbox.error(player_id, e.to_string());
            return CommandResult::error(round_times.look);
        }
    };

    if items.is_empty() {
        outbox.info(player_id, format!("You hack at the {} but ruin the hide.", corpse_name));
    } else {
        outbox.info(player_id, format!("You skin the {}.", corpse_name));
    }
    for item_id in &items {
        give_or_drop(player, room, item_id, catalog.item_name(item_id), outbox);
    }
    if exhausted {
        room.corpses.remove(&corpse_id);
    }

    CommandResult::success(round_times.skin)
}

fn cmd_help(outbox: &mut Outbox, player_id: PlayerId) -> CommandResult {
    let mut help = String::from("Available commands:\n");
    help.push_str("  look [target] - Describe the room or something in it\n");
    help.push_str("  north, south, ... / go <direction> - Move\n");
    help.push_str("  attack <target> - Attack a creature\n");
    help.push_str("  search [corpse] - Take what a corpse carries\n");
    help.push_str("  skin [corpse] - Skin a corpse\n");
    help.push_str("  equip <item> [slot] - Equip an item\n");
    help.push_str("  unequip <slot|item> - Remove an item\n");
    help.push_str("  inventory - List what you carry and wear");
    outbox.push(player_id, MessageType::System, help);
    CommandResult::success(0.0)
}
