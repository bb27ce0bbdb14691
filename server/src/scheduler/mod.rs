//! The authoritative tick loop.
//!
//! Sessions never touch the world directly. They push events into the
//! intake channel, and once per tick the scheduler drains it and runs every
//! subsystem in a fixed order: commands, environment, respawns, corpse
//! decay, entity aggression, absorption, autosave. Outbound text is flushed
//! at the end.

mod outbox;

pub use outbox::Outbox;

use std::time::{Duration, Instant};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use mud_shared::{MessageType, OutboundMessage, PlayerCommand, PlayerId};

use crate::aggression;
use crate::commands;
use crate::entities::Player;
use crate::environment::weather_announcement;
use crate::experience;
use crate::persistence::PersistenceHandle;
use crate::world::{sweep_corpses, GameWorld};

/// Told to a player whose save could not be queued
pub const SAVE_FAILED: &str = "Your character could not be saved right now.";

/// Something a session asks of the world
#[derive(Debug)]
pub enum SessionEvent {
    Command(PlayerCommand),
    Connect(Box<Player>),
    Disconnect(PlayerId),
}

/// Sending side of the intake queue; cheap to clone, one per session
#[derive(Clone)]
pub struct CommandIntake {
    sender: mpsc::UnboundedSender<SessionEvent>,
}

impl CommandIntake {
    /// Queue a command for the next tick; false once the scheduler is gone
    pub fn submit(&self, command: PlayerCommand) -> bool {
        self.sender.send(SessionEvent::Command(command)).is_ok()
    }

    pub fn connect(&self, player: Player) -> bool {
        self.sender.send(SessionEvent::Connect(Box::new(player))).is_ok()
    }

    pub fn disconnect(&self, player_id: PlayerId) -> bool {
        self.sender.send(SessionEvent::Disconnect(player_id)).is_ok()
    }
}

/// Owns the world and advances it one tick at a time
pub struct TickScheduler {
    world: GameWorld,
    intake: mpsc::UnboundedReceiver<SessionEvent>,
    intake_closed: bool,
    outbox: Outbox,
    persistence: Option<PersistenceHandle>,
    rng: StdRng,
    tick: u64,
}

impl TickScheduler {
    pub fn new(world: GameWorld, persistence: Option<PersistenceHandle>) -> (Self, CommandIntake) {
        Self::with_rng(world, persistence, StdRng::from_entropy())
    }

    /// Build with a given random source, for reproducible runs
    pub fn with_rng(world: GameWorld, persistence: Option<PersistenceHandle>, rng: StdRng) -> (Self, CommandIntake) {
        let (sender, intake) = mpsc::unbounded_channel();
        let scheduler = Self {
            world,
            intake,
            intake_closed: false,
            outbox: Outbox::new(),
            persistence,
            rng,
            tick: 0,
        };
        (scheduler, CommandIntake { sender })
    }

    pub fn world(&self) -> &GameWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut GameWorld {
        &mut self.world
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    fn due(&self, interval: u64) -> bool {
        interval > 0 && self.tick % interval == 0
    }

    /// Advance the world by one tick at game time `now` (seconds)
    pub fn run_tick(&mut self, now: f64) -> Vec<OutboundMessage> {
        self.tick += 1;
        let intervals = self.world.config.scheduler.clone();

        let commands = self.drain_intake();
        for command in &commands {
            self.resolve_command(command, now);
        }

        if self.due(intervals.time_change_interval_ticks) {
            let announcement = self.world.environment.advance_time();
            let exposed = self.world.exposed_players();
            self.outbox.broadcast(&exposed, None, MessageType::Ambient, announcement);
        }
        if self.due(intervals.weather_change_interval_ticks) {
            if let Some(weather) = self.world.environment.roll_weather(&mut self.rng) {
                debug!("Weather changed to {}", weather);
                let exposed = self.world.exposed_players();
                self.outbox.broadcast(&exposed, None, MessageType::Ambient, &weather_announcement(weather));
            }
        }

        if self.due(intervals.respawn_interval_ticks) {
            self.respawn_sweep(now);
        }

        if self.due(intervals.corpse_decay_interval_ticks) {
            self.decay_sweep(now);
        }

        if self.due(intervals.aggression_interval_ticks) {
            aggression::run(&mut self.world, &mut self.outbox, now, &mut self.rng);
            let engaged = self.world.aggression.engaged_count();
            if engaged > 0 {
                debug!("{} entities in combat after tick {}", engaged, self.tick);
            }
        }

        if self.due(intervals.xp_absorption_interval_ticks) {
            self.absorb_all();
        }

        if self.due(intervals.autosave_interval_ticks) {
            self.autosave();
        }

        self.outbox.flush()
    }

    /// Apply connects and disconnects now; hand commands back in arrival order
    fn drain_intake(&mut self) -> Vec<PlayerCommand> {
        let mut commands = Vec::new();
        loop {
            match self.intake.try_recv() {
                Ok(SessionEvent::Command(command)) => commands.push(command),
                Ok(SessionEvent::Connect(player)) => self.connect(*player),
                Ok(SessionEvent::Disconnect(player_id)) => self.disconnect(player_id),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.intake_closed = true;
                    break;
                }
            }
        }
        commands
    }

    fn connect(&mut self, player: Player) {
        let id = player.id;
        info!("Player {} ({}) entered the world", id, player.name);
        let name = player.name.clone();
        self.world.add_player(player);

        let room = self.world.get_player(id).map(|p| p.room_id).unwrap_or(self.world.config.player.start_room);
        let others = self.world.players_in_room(room);
        self.outbox.broadcast(&others, Some(id), MessageType::Room, &format!("{} arrives.", name));
        self.outbox.push(id, MessageType::System, format!("Welcome, {}.", name));
        self.outbox.push(id, MessageType::Room, self.world.describe_room(room, id));
    }

    fn disconnect(&mut self, player_id: PlayerId) {
        let Some(player) = self.world.remove_player(player_id) else {
            warn!("Disconnect for unknown player {}", player_id);
            return;
        };
        info!("Player {} ({}) left the world", player_id, player.name);
        self.world.aggression.release_target(player_id);
        let others = self.world.players_in_room(player.room_id);
        self.outbox.broadcast(&others, None, MessageType::Room, &format!("{} leaves.", player.name));

        if let Some(persistence) = &self.persistence {
            let name = player.name.clone();
            if let Err(e) = persistence.save(player) {
                // nobody is left to tell
                error!("Character {} ({}) was not saved on logout: {}", player_id, name, e);
            }
        }
    }

    fn resolve_command(&mut self, command: &PlayerCommand, now: f64) {
        let Some(player) = self.world.get_player(command.player_id) else {
            warn!("Command from player {} who is not connected", command.player_id);
            return;
        };
        if now < player.next_action_time {
            let wait = player.next_action_time - now;
            self.outbox.error(command.player_id, format!("You must wait {:.1} seconds.", wait));
            return;
        }

        let result = commands::execute(&mut self.world, &mut self.outbox, command, now, &mut self.rng);
        if let Some(player) = self.world.get_player_mut(command.player_id) {
            player.next_action_time = now + result.roundtime;
        }
        if result.roundtime >= 1.0 {
            self.outbox.push(
                command.player_id,
                MessageType::System,
                format!("Roundtime: {:.1} seconds.", result.roundtime),
            );
        }
    }

    fn respawn_sweep(&mut self, now: f64) {
        let world = &mut self.world;
        let respawned = world.respawns.sweep(&mut world.rooms, &world.catalog, now, &mut self.rng);
        for entry in respawned {
            let occupants = world.players_in_room(entry.room);
            self.outbox.broadcast(&occupants, None, MessageType::Room, &entry.announcement());
        }
    }

    fn decay_sweep(&mut self, now: f64) {
        let decayed = sweep_corpses(&mut self.world.rooms, now);
        if !decayed.is_empty() {
            debug!("Decay sweep removed {} corpses", decayed.len());
        }
        for corpse in decayed {
            let occupants = self.world.players_in_room(corpse.room);
            self.outbox.broadcast(&occupants, None, MessageType::Room, &corpse.announcement());
        }
    }

    fn absorb_all(&mut self) {
        let world = &mut self.world;
        for player in world.players.values_mut() {
            let room = world.catalog.room(player.room_id);
            let result = experience::absorb(player, room, &world.catalog, &world.config.experience);
            for message in result.messages {
                self.outbox.push(player.id, MessageType::Experience, message);
            }
        }
    }

    fn autosave(&mut self) {
        let Some(persistence) = &self.persistence else {
            return;
        };
        let mut failed = 0;
        for player in self.world.players.values() {
            if persistence.save(player.clone()).is_err() {
                failed += 1;
                self.outbox.error(player.id, SAVE_FAILED);
            }
        }
        if failed > 0 {
            error!("Autosave could not queue {} of {} players", failed, self.world.player_count());
        } else {
            debug!("Autosave dispatched for {} players", self.world.player_count());
        }
    }

    /// Save everyone still connected
    fn shutdown(&mut self) {
        self.autosave();
        info!("Scheduler stopped after {} ticks", self.tick);
    }

    /// Run ticks until every session is gone, sending output to `sink`
    pub async fn run(mut self, sink: mpsc::UnboundedSender<OutboundMessage>) {
        let tick_duration = Duration::from_millis(self.world.config.scheduler.tick_interval_ms.max(1));
        let started = Instant::now();
        info!("Scheduler started: {}ms ticks", tick_duration.as_millis());

        loop {
            let tick_start = Instant::now();
            let now = started.elapsed().as_secs_f64();

            for message in self.run_tick(now) {
                if sink.send(message).is_err() {
                    info!("Output closed");
                    self.shutdown();
                    return;
                }
            }

            if self.intake_closed {
                self.shutdown();
                return;
            }

            // Sleep until next tick
            let elapsed = tick_start.elapsed();
            if elapsed < tick_duration {
                tokio::time::sleep(tick_duration - elapsed).await;
            } else {
                warn!("Tick {} took {:?}, longer than the {:?} interval", self.tick, elapsed, tick_duration);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::config::GameConfig;
    use crate::content::ContentCatalog;
    use crate::entities::player::tests::test_player;
    use crate::entities::Corpse;
    use crate::persistence::{self, MemoryRepository, PlayerRepository};

    fn scheduler(config: GameConfig) -> (TickScheduler, CommandIntake) {
        let world = GameWorld::new(ContentCatalog::with_defaults(), config);
        TickScheduler::with_rng(world, None, StdRng::seed_from_u64(99))
    }

    fn quiet_config() -> GameConfig {
        let mut config = GameConfig::default();
        let s = &mut config.scheduler;
        s.respawn_interval_ticks = 0;
        s.corpse_decay_interval_ticks = 0;
        s.xp_absorption_interval_ticks = 0;
        s.time_change_interval_ticks = 0;
        s.weather_change_interval_ticks = 0;
        s.autosave_interval_ticks = 0;
        s.aggression_interval_ticks = 0;
        config
    }

    fn payloads(messages: &[OutboundMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.payload.as_str()).collect()
    }

    #[test]
    fn test_command_during_cooldown_is_rejected() {
        let (mut scheduler, intake) = scheduler(quiet_config());
        let catalog = ContentCatalog::with_defaults();
        intake.connect(test_player(&catalog));
        scheduler.run_tick(0.0);

        intake.submit(PlayerCommand::parse(1, "attack dummy", 0));
        scheduler.run_tick(0.0);
        let cooldown = scheduler.world().get_player(1).unwrap().next_action_time;
        assert_eq!(cooldown, 3.0);

        intake.submit(PlayerCommand::parse(1, "north", 1000));
        let out = scheduler.run_tick(1.0);
        assert_eq!(payloads(&out), vec!["You must wait 2.0 seconds."]);
        let player = scheduler.world().get_player(1).unwrap();
        assert_eq!(player.room_id, 1);
        assert_eq!(player.next_action_time, cooldown);

        intake.submit(PlayerCommand::parse(1, "north", 3000));
        scheduler.run_tick(3.0);
        assert_eq!(scheduler.world().get_player(1).unwrap().room_id, 2);
    }

    #[test]
    fn test_second_command_in_same_tick_waits() {
        let (mut scheduler, intake) = scheduler(quiet_config());
        let catalog = ContentCatalog::with_defaults();
        intake.connect(test_player(&catalog));
        scheduler.run_tick(0.0);

        intake.submit(PlayerCommand::parse(1, "north", 0));
        intake.submit(PlayerCommand::parse(1, "south", 0));
        let out = scheduler.run_tick(0.0);
        assert_eq!(scheduler.world().get_player(1).unwrap().room_id, 2);
        assert!(payloads(&out).contains(&"You must wait 0.5 seconds."));
    }

    #[test]
    fn test_absorption_on_its_tick() {
        let mut config = quiet_config();
        config.scheduler.xp_absorption_interval_ticks = 2;
        let (mut scheduler, intake) = scheduler(config);
        let catalog = ContentCatalog::with_defaults();
        let mut player = test_player(&catalog);
        player.unabsorbed_xp = 50;
        intake.connect(player);

        scheduler.run_tick(0.0);
        assert_eq!(scheduler.world().get_player(1).unwrap().xp, 0);

        let out = scheduler.run_tick(0.25);
        let player = scheduler.world().get_player(1).unwrap();
        assert_eq!(player.xp, 25);
        assert_eq!(player.unabsorbed_xp, 25);
        assert!(payloads(&out).contains(&"You feel more experienced (+25 XP)."));
    }

    #[test]
    fn test_output_is_flushed_each_tick() {
        let (mut scheduler, intake) = scheduler(quiet_config());
        let catalog = ContentCatalog::with_defaults();
        intake.connect(test_player(&catalog));

        let first = scheduler.run_tick(0.0);
        assert_eq!(first[0].payload, "Welcome, Tester.");
        assert!(first[1].payload.starts_with("[Oakhaven Well - Town Center]"));
        assert!(scheduler.run_tick(0.25).is_empty());
    }

    #[test]
    fn test_time_change_reaches_exposed_rooms_only() {
        let mut config = quiet_config();
        config.scheduler.time_change_interval_ticks = 1;
        let (mut scheduler, intake) = scheduler(config);
        let catalog = ContentCatalog::with_defaults();
        let mut outside = test_player(&catalog);
        outside.id = 1;
        let mut cellar = test_player(&catalog);
        cellar.id = 2;
        cellar.room_id = 4;
        intake.connect(outside);
        intake.connect(cellar);

        let out = scheduler.run_tick(0.0);
        let ambient: Vec<PlayerId> = out
            .iter()
            .filter(|m| m.message_type == MessageType::Ambient)
            .map(|m| m.player_id)
            .collect();
        assert_eq!(ambient, vec![1]);
    }

    #[test]
    fn test_respawn_announced_to_room() {
        let mut config = quiet_config();
        config.scheduler.respawn_interval_ticks = 1;
        let (mut scheduler, intake) = scheduler(config);
        let catalog = ContentCatalog::with_defaults();
        let mut player = test_player(&catalog);
        player.room_id = 4;
        player.stats.set(mud_shared::Stat::Strength, 200);
        intake.connect(player);
        scheduler.run_tick(0.0);

        let mut now = 0.0;
        for _ in 0..50 {
            if !scheduler.world().respawns.is_empty() {
                break;
            }
            now += 5.0;
            intake.submit(PlayerCommand::parse(1, "attack rat", 0));
            scheduler.run_tick(now);
        }
        assert_eq!(scheduler.world().respawns.len(), 1);
        assert_eq!(scheduler.world().rooms[&4].entities.alive_count("giant_rat", None), 0);

        let out = scheduler.run_tick(now + 25.0);
        assert!(payloads(&out).contains(&"Giant Rat has appeared."));
        assert_eq!(scheduler.world().rooms[&4].entities.alive_count("giant_rat", None), 1);
    }

    #[test]
    fn test_decay_is_announced_to_room() {
        let mut config = quiet_config();
        config.scheduler.corpse_decay_interval_ticks = 1;
        let (mut scheduler, intake) = scheduler(config);
        let catalog = ContentCatalog::with_defaults();
        intake.connect(test_player(&catalog));
        scheduler.run_tick(0.0);

        scheduler.world_mut().rooms.get_mut(&1).unwrap().corpses.insert(
            3,
            Corpse {
                id: 3,
                name: "corpse of a Training Dummy".into(),
                template_key: "training_dummy".into(),
                keywords: vec!["dummy".into()],
                inventory: Vec::new(),
                gold: 0,
                skinnable: false,
                skinned: false,
                searched: false,
                created_at: 0.0,
                decay_at: 10.0,
            },
        );
        assert!(scheduler.run_tick(5.0).is_empty());

        let out = scheduler.run_tick(10.0);
        assert_eq!(payloads(&out), vec!["The corpse of a Training Dummy decays and disappears."]);
        assert_eq!(out[0].message_type, MessageType::Room);
        assert!(scheduler.world().rooms[&1].corpses.is_empty());
    }

    #[test]
    fn test_aggression_runs_on_its_tick() {
        let mut config = quiet_config();
        config.scheduler.aggression_interval_ticks = 2;
        let (mut scheduler, intake) = scheduler(config);
        let catalog = ContentCatalog::with_defaults();
        let mut player = test_player(&catalog);
        player.room_id = 4;
        intake.connect(player);

        scheduler.run_tick(0.0);
        assert_eq!(scheduler.world().aggression.engaged_count(), 0);

        let out = scheduler.run_tick(0.25);
        assert_eq!(scheduler.world().aggression.engaged_count(), 1);
        assert!(payloads(&out).contains(&"The Giant Rat fixes its eyes on you and attacks!"));
    }

    #[tokio::test]
    async fn test_failed_autosave_is_reported_to_player() {
        let handle = persistence::spawn(Arc::new(MemoryRepository::new()));
        handle.shutdown().await;
        let mut config = quiet_config();
        config.scheduler.autosave_interval_ticks = 1;
        let world = GameWorld::new(ContentCatalog::with_defaults(), config);
        let (mut scheduler, intake) = TickScheduler::with_rng(world, Some(handle), StdRng::seed_from_u64(1));

        intake.connect(test_player(&scheduler.world().catalog));
        let out = scheduler.run_tick(0.0);
        let errors: Vec<&OutboundMessage> = out.iter().filter(|m| m.message_type == MessageType::Error).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].player_id, 1);
        assert_eq!(errors[0].payload, SAVE_FAILED);

        // a failed logout save still lets the player go
        intake.disconnect(1);
        scheduler.run_tick(0.25);
        assert_eq!(scheduler.world().player_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_saves_in_background() {
        let repo = Arc::new(MemoryRepository::new());
        let handle = persistence::spawn(repo.clone());
        let world = GameWorld::new(ContentCatalog::with_defaults(), quiet_config());
        let (mut scheduler, intake) = TickScheduler::with_rng(world, Some(handle.clone()), StdRng::seed_from_u64(1));

        let mut player = test_player(&scheduler.world().catalog);
        player.gold = 7;
        intake.connect(player);
        scheduler.run_tick(0.0);
        intake.disconnect(1);
        scheduler.run_tick(0.25);
        assert_eq!(scheduler.world().player_count(), 0);

        // the load is queued behind the save
        let saved = handle.load(1).await.unwrap();
        assert_eq!(saved.gold, 7);
        assert!(repo.load(1).await.is_ok());
    }
}
