//! MUD Server
//!
//! An authoritative tick-driven simulation for a text world, played from the
//! local terminal.

mod aggression;
mod combat;
mod commands;
mod config;
mod content;
mod entities;
mod environment;
mod experience;
mod loot;
mod network;
mod persistence;
mod rules;
mod scheduler;
mod world;

use std::sync::Arc;
use log::{error, info, warn};
use tokio::sync::mpsc;

use mud_shared::{PlayerId, RaceDef};

use crate::config::GameConfig;
use crate::content::{ContentCatalog, CONTENT_PATH_ENV};
use crate::entities::Player;
use crate::network::ConsoleSession;
use crate::persistence::{MemoryRepository, PersistenceError, PersistenceHandle};
use crate::scheduler::TickScheduler;
use crate::world::GameWorld;

/// Id used for the terminal player's saved record
const CONSOLE_PLAYER_ID: PlayerId = 1;

/// Told to the player when their saved character can't be read
const LOAD_FAILED: &str = "Your character could not be loaded right now. Please try again later.";

/// Load the saved character, or roll a fresh one if none exists.
///
/// Any other load failure is returned; creating a character then would
/// overwrite the stored one on the next save.
async fn load_or_create_player(
    persistence: &PersistenceHandle,
    name: &str,
    catalog: &ContentCatalog,
    config: &GameConfig,
) -> Result<Player, PersistenceError> {
    match persistence.load(CONSOLE_PLAYER_ID).await {
        Ok(player) => return Ok(player),
        Err(PersistenceError::NotFound(_)) => {}
        Err(e) => return Err(e),
    }

    let race = match catalog.race(&config.player.default_race) {
        Some(race) => race.clone(),
        None => {
            warn!("Unknown default race '{}'", config.player.default_race);
            RaceDef::default()
        }
    };
    info!("Creating new character {} ({})", name, race.name);
    Ok(Player::new(CONSOLE_PLAYER_ID, name, &race, config.player.start_room, catalog))
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting MUD Server...");

    let config = GameConfig::load();
    let content_path = std::env::var(CONTENT_PATH_ENV).ok().or_else(|| config.persistence.content_path.clone());
    let catalog = ContentCatalog::load(content_path.as_deref());
    info!("Tick interval: {}ms", config.scheduler.tick_interval_ms);

    // Initialize persistence (database + cache)
    let persistence = match persistence::init(&config.persistence.database_url, &config.persistence.redis_url).await {
        Ok(p) => {
            info!("Persistence layer initialized");
            p
        }
        Err(e) => {
            error!("Failed to initialize persistence: {}", e);
            error!("Characters will only be kept for this run");
            persistence::spawn(Arc::new(MemoryRepository::new()))
        }
    };

    let name = std::env::args().nth(1).unwrap_or_else(|| "Adventurer".to_string());
    let player = match load_or_create_player(&persistence, &name, &catalog, &config).await {
        Ok(player) => player,
        Err(e) => {
            error!("Failed to load saved character: {}", e);
            println!("{}", LOAD_FAILED);
            persistence.shutdown().await;
            return;
        }
    };

    let world = GameWorld::new(catalog, config);
    let (scheduler, intake) = TickScheduler::new(world, Some(persistence.clone()));
    let (output_tx, output_rx) = mpsc::unbounded_channel();
    let simulation = tokio::spawn(scheduler.run(output_tx));

    info!("Server started successfully!");

    ConsoleSession::new(CONSOLE_PLAYER_ID, intake).run(player, output_rx).await;

    if let Err(e) = simulation.await {
        error!("Scheduler task failed: {}", e);
    }
    persistence.shutdown().await;
    info!("Server stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use async_trait::async_trait;
    use crate::persistence::PlayerRepository;

    /// Storage that can't be read but counts writes
    #[derive(Default)]
    struct UnreadableRepository {
        saves: AtomicUsize,
    }

    #[async_trait]
    impl PlayerRepository for UnreadableRepository {
        async fn load(&self, _player_id: PlayerId) -> Result<Player, PersistenceError> {
            Err(PersistenceError::Unavailable("connection reset".into()))
        }

        async fn save(&self, _player: &Player) -> Result<(), PersistenceError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_load_failure_does_not_create_character() {
        let repo = Arc::new(UnreadableRepository::default());
        let handle = persistence::spawn(repo.clone());
        let catalog = ContentCatalog::with_defaults();
        let config = GameConfig::default();

        let result = load_or_create_player(&handle, "Rowan", &catalog, &config).await;
        assert!(matches!(result, Err(PersistenceError::Unavailable(_))));
        handle.shutdown().await;
        assert_eq!(repo.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_character_is_created() {
        let handle = persistence::spawn(Arc::new(MemoryRepository::new()));
        let catalog = ContentCatalog::with_defaults();
        let config = GameConfig::default();

        let player = load_or_create_player(&handle, "Rowan", &catalog, &config).await.unwrap();
        assert_eq!(player.id, CONSOLE_PLAYER_ID);
        assert_eq!(player.name, "Rowan");
        assert_eq!(player.room_id, config.player.start_room);
    }
}
