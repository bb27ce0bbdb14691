//! Entities that start fights on their own.
//!
//! Each pass, an idle hostile entity picks a player standing in its room.
//! Threatening entities glare first and attack once their patience runs out.
//! Engaged entities swing whenever their attack delay is up, and let go when
//! the target leaves, disconnects or goes down.

use std::collections::BTreeMap;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;

use mud_shared::{Disposition, EntityKind, EntityTemplate, MessageType, PlayerId, RoomId};

use crate::combat::{resolve_attack_on_player, Fighter};
use crate::config::AggressionConfig;
use crate::entities::{EntityRuntime, RuntimeHandle};
use crate::scheduler::Outbox;
use crate::world::GameWorld;

/// An entity locked onto a player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Engagement {
    pub target: PlayerId,
    pub next_attack_at: f64,
}

/// A warning that turns into an attack at `engage_at`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threat {
    pub target: PlayerId,
    pub engage_at: f64,
}

/// Who is fighting whom; owned by the world, touched only inside the tick
#[derive(Debug, Default)]
pub struct AggressionTracker {
    engaged: BTreeMap<RuntimeHandle, Engagement>,
    threats: BTreeMap<RuntimeHandle, Threat>,
}

impl AggressionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engagement(&self, handle: RuntimeHandle) -> Option<Engagement> {
        self.engaged.get(&handle).copied()
    }

    pub fn is_engaged(&self, handle: RuntimeHandle) -> bool {
        self.engaged.contains_key(&handle)
    }

    pub fn is_threatening(&self, handle: RuntimeHandle) -> bool {
        self.threats.contains_key(&handle)
    }

    pub fn engaged_count(&self) -> usize {
        self.engaged.len()
    }

    /// Lock `handle` onto `target`; the first swing comes at `first_swing_at`
    pub fn engage(&mut self, handle: RuntimeHandle, target: PlayerId, first_swing_at: f64) {
        self.threats.remove(&handle);
        self.engaged.insert(handle, Engagement { target, next_attack_at: first_swing_at });
    }

    /// Engage unless already fighting someone; true when this started a fight
    pub fn provoke(&mut self, handle: RuntimeHandle, target: PlayerId, first_swing_at: f64) -> bool {
        if self.is_engaged(handle) {
            return false;
        }
        self.engage(handle, target, first_swing_at);
        true
    }

    pub fn threaten(&mut self, handle: RuntimeHandle, target: PlayerId, engage_at: f64) {
        self.threats.insert(handle, Threat { target, engage_at });
    }

    /// Forget everything about an entity
    pub fn release(&mut self, handle: RuntimeHandle) {
        self.engaged.remove(&handle);
        self.threats.remove(&handle);
    }

    /// Stop every fight and threat aimed at a player
    pub fn release_target(&mut self, player: PlayerId) {
        self.engaged.retain(|_, e| e.target != player);
        self.threats.retain(|_, t| t.target != player);
    }

    fn set_next_attack(&mut self, handle: RuntimeHandle, at: f64) {
        if let Some(engagement) = self.engaged.get_mut(&handle) {
            engagement.next_attack_at = at;
        }
    }

    fn due_threats(&self, now: f64) -> Vec<(RuntimeHandle, Threat)> {
        self.threats
            .iter()
            .filter(|(_, t)| t.engage_at <= now)
            .map(|(h, t)| (*h, *t))
            .collect()
    }
}

/// How an entity is named at the start of a sentence
pub fn subject(runtime: &EntityRuntime) -> String {
    match runtime.kind {
        EntityKind::Monster => format!("The {}", runtime.name),
        EntityKind::Npc => runtime.name.clone(),
    }
}

/// How an entity is named mid-sentence
fn object(runtime: &EntityRuntime) -> String {
    match runtime.kind {
        EntityKind::Monster => format!("the {}", runtime.name),
        EntityKind::Npc => runtime.name.clone(),
    }
}

/// Seconds until the next swing, scaled by a random factor around 1
pub fn swing_delay<R: Rng + ?Sized>(template: &EntityTemplate, config: &AggressionConfig, rng: &mut R) -> f64 {
    let base = template.attack_delay_secs.max(0.0);
    let jitter = config.attack_delay_jitter.clamp(0.0, 1.0);
    if jitter == 0.0 {
        return base;
    }
    base * rng.gen_range((1.0 - jitter)..=(1.0 + jitter))
}

/// What an idle entity decided to do this pass
enum Opening {
    Engage { handle: RuntimeHandle, target: PlayerId, first_swing_at: f64 },
    Threaten { handle: RuntimeHandle, target: PlayerId },
}

/// One aggression pass: pick targets, carry out threats, then swing
pub fn run<R: Rng + ?Sized>(world: &mut GameWorld, outbox: &mut Outbox, now: f64, rng: &mut R) {
    pick_targets(world, outbox, now, rng);
    carry_out_threats(world, outbox, now, rng);
    swing_all(world, outbox, now, rng);
}

fn pick_targets<R: Rng + ?Sized>(world: &mut GameWorld, outbox: &mut Outbox, now: f64, rng: &mut R) {
    let mut occupied: BTreeMap<RoomId, Vec<PlayerId>> = BTreeMap::new();
    for player in world.players.values().filter(|p| p.hp > 0) {
        occupied.entry(player.room_id).or_default().push(player.id);
    }

    let config = &world.config.aggression;
    let mut openings = Vec::new();
    for (room_id, mut occupants) in occupied {
        occupants.sort_unstable();
        let Some(room) = world.rooms.get(&room_id) else {
            continue;
        };
        for (handle, runtime) in room.entities.iter() {
            if !runtime.is_alive() || world.aggression.is_engaged(handle) {
                continue;
            }
            let Some(template) = world.catalog.entity(&runtime.template_key) else {
                continue;
            };

            let hostile: Vec<PlayerId> = occupants
                .iter()
                .copied()
                .filter(|id| {
                    let standing = match (&template.faction, world.players.get(id)) {
                        (Some(faction), Some(player)) => player.faction_standing(faction),
                        _ => 0,
                    };
                    template.is_hostile_to(standing, config.faction_hostility_threshold)
                })
                .collect();

            if let Some(&target) = hostile.choose(rng) {
                let first_swing_at = now + swing_delay(template, config, rng);
                openings.push(Opening::Engage { handle, target, first_swing_at });
            } else if template.disposition == Disposition::Threatening && !world.aggression.is_threatening(handle) {
                if let Some(&target) = occupants.choose(rng) {
                    openings.push(Opening::Threaten { handle, target });
                }
            }
        }
    }

    let threat_delay = world.config.aggression.threatening_delay_secs;
    for opening in openings {
        match opening {
            Opening::Engage { handle, target, first_swing_at } => {
                world.aggression.engage(handle, target, first_swing_at);
                announce_engage(world, outbox, handle, target);
            }
            Opening::Threaten { handle, target } => {
                world.aggression.threaten(handle, target, now + threat_delay);
                announce_threat(world, outbox, handle, target);
            }
        }
    }
}

fn carry_out_threats<R: Rng + ?Sized>(world: &mut GameWorld, outbox: &mut Outbox, now: f64, rng: &mut R) {
    for (handle, threat) in world.aggression.due_threats(now) {
        world.aggression.release(handle);
        if !target_in_reach(world, handle, threat.target) {
            continue;
        }
        let Some(runtime) = alive_entity(world, handle) else {
            continue;
        };
        let Some(template) = world.catalog.entity(&runtime.template_key) else {
            continue;
        };
        let first_swing_at = now + swing_delay(template, &world.config.aggression, rng);
        let subj = subject(runtime);
        let Some(name) = world.get_player(threat.target).map(|p| p.name.clone()) else {
            continue;
        };

        world.aggression.engage(handle, threat.target, first_swing_at);
        let witnesses = world.players_in_room(handle.room);
        outbox.push(
            threat.target,
            MessageType::Combat,
            format!("{}'s patience wears thin and it lunges at you!", subj),
        );
        outbox.broadcast(
            &witnesses,
            Some(threat.target),
            MessageType::Combat,
            &format!("{} loses patience and attacks {}!", subj, name),
        );
    }
}

fn swing_all<R: Rng + ?Sized>(world: &mut GameWorld, outbox: &mut Outbox, now: f64, rng: &mut R) {
    let handles: Vec<RuntimeHandle> = world.aggression.engaged.keys().copied().collect();
    for handle in handles {
        // an earlier defeat this pass may already have released it
        let Some(engagement) = world.aggression.engagement(handle) else {
            continue;
        };
        if alive_entity(world, handle).is_none() || !target_in_reach(world, handle, engagement.target) {
            debug!("Entity {:?} disengages from player {}", handle, engagement.target);
            world.aggression.release(handle);
            continue;
        }
        if now < engagement.next_attack_at {
            continue;
        }
        strike(world, outbox, handle, engagement.target, now, rng);
    }
}

/// One swing at an engaged target, including the defeat path
fn strike<R: Rng + ?Sized>(
    world: &mut GameWorld,
    outbox: &mut Outbox,
    handle: RuntimeHandle,
    target: PlayerId,
    now: f64,
    rng: &mut R,
) {
    let (outcome, subj, obj, victim, max_hp, next_attack_at) = {
        let GameWorld { catalog, config, rooms, players, .. } = &mut *world;
        let (Some(room), Some(player)) = (rooms.get(&handle.room), players.get_mut(&target)) else {
            return;
        };
        let Some(runtime) = room.entities.get(handle) else {
            return;
        };
        let Some(template) = catalog.entity(&runtime.template_key) else {
            return;
        };
        let outcome = resolve_attack_on_player(&Fighter::entity(runtime, template), player, catalog, &config.combat, rng);
        let next_attack_at = now + swing_delay(template, &config.aggression, rng);
        (outcome, subject(runtime), object(runtime), player.name.clone(), player.max_hp, next_attack_at)
    };

    let Some(swing) = outcome.swing else {
        world.aggression.release(handle);
        return;
    };

    let witnesses = world.players_in_room(handle.room);
    let weapon = match &swing.weapon {
        Some(name) => format!("its {}", name),
        None => "its natural weapons".to_string(),
    };
    outbox.push(target, MessageType::Combat, format!("{} swings {} at you!", subj, weapon));

    if !swing.hit {
        outbox.push(target, MessageType::Combat, format!("{} MISSES you!", subj));
        outbox.broadcast(
            &witnesses,
            Some(target),
            MessageType::Combat,
            &format!("{} attacks {} with {} but MISSES!", subj, victim, weapon),
        );
        world.aggression.set_next_attack(handle, next_attack_at);
        return;
    }

    outbox.broadcast(
        &witnesses,
        Some(target),
        MessageType::Combat,
        &format!("{} HITS {} with {} for {} damage!", subj, victim, weapon, outcome.damage),
    );

    if !outcome.defeated {
        outbox.push(
            target,
            MessageType::Combat,
            format!("{} HITS you for {} damage! (HP: {}/{})", subj, outcome.damage, outcome.remaining_hp, max_hp),
        );
        world.aggression.set_next_attack(handle, next_attack_at);
        return;
    }

    outbox.push(
        target,
        MessageType::Combat,
        format!("{}'s blow lands true! You have been DEFEATED!", subj),
    );
    outbox.broadcast(
        &witnesses,
        Some(target),
        MessageType::Combat,
        &format!("{} has been struck down by {}!", victim, obj),
    );
    defeat_player(world, outbox, target);
}

/// Send a downed player to the death room with one hit point
fn defeat_player(world: &mut GameWorld, outbox: &mut Outbox, target: PlayerId) {
    let death_room = world.config.player.death_room;
    let Some(player) = world.get_player_mut(target) else {
        return;
    };
    player.revive_at(death_room);
    info!("Player {} was defeated and wakes in room {}", target, death_room);
    world.aggression.release_target(target);
    outbox.push(target, MessageType::System, "You slowly regain consciousness...");
    outbox.push(target, MessageType::Room, world.describe_room(death_room, target));
}

fn alive_entity(world: &GameWorld, handle: RuntimeHandle) -> Option<&EntityRuntime> {
    world
        .rooms
        .get(&handle.room)
        .and_then(|room| room.entities.get(handle))
        .filter(|runtime| runtime.is_alive())
}

fn target_in_reach(world: &GameWorld, handle: RuntimeHandle, target: PlayerId) -> bool {
    world
        .get_player(target)
        .map(|p| p.hp > 0 && p.room_id == handle.room)
        .unwrap_or(false)
}

fn announce_engage(world: &GameWorld, outbox: &mut Outbox, handle: RuntimeHandle, target: PlayerId) {
    let (Some(runtime), Some(player)) = (alive_entity(world, handle), world.get_player(target)) else {
        return;
    };
    let (to_target, to_others) = match runtime.kind {
        EntityKind::Monster => (
            format!("The {} fixes its eyes on you and attacks!", runtime.name),
            format!("The {} snarls and lunges at {}!", runtime.name, player.name),
        ),
        EntityKind::Npc => (
            format!("{} turns on you with malice!", runtime.name),
            format!("{} shouts an insult at {} and attacks!", runtime.name, player.name),
        ),
    };
    let witnesses = world.players_in_room(handle.room);
    outbox.push(target, MessageType::Combat, to_target);
    outbox.broadcast(&witnesses, Some(target), MessageType::Combat, &to_others);
}

fn announce_threat(world: &GameWorld, outbox: &mut Outbox, handle: RuntimeHandle, target: PlayerId) {
    let (Some(runtime), Some(player)) = (alive_entity(world, handle), world.get_player(target)) else {
        return;
    };
    let (to_target, to_others) = match runtime.kind {
        EntityKind::Monster => (
            format!("The {} eyes you menacingly.", runtime.name),
            format!("The {} eyes {} menacingly.", runtime.name, player.name),
        ),
        EntityKind::Npc => (
            format!("{} seems to be sizing you up...", runtime.name),
            format!("{} gives {} a menacing glare.", runtime.name, player.name),
        ),
    };
    let witnesses = world.players_in_room(handle.room);
    outbox.push(target, MessageType::Combat, to_target);
    outbox.broadcast(&witnesses, Some(target), MessageType::Combat, &to_others);
}
