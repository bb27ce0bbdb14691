//! Persistence layer for player records.
//!
//! The tick loop never waits on storage. Saves are handed to a background
//! task over a channel and loads are answered through a oneshot reply.

mod cache;
mod database;
mod repository;

pub use cache::Cache;
pub use database::{Database, PostgresRepository};
pub use repository::{CachedRepository, MemoryRepository, PlayerRepository};

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use log::{debug, error, info, warn};

use mud_shared::PlayerId;

use crate::entities::Player;

/// Queue depth for the background task
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("no saved player with id {0}")]
    NotFound(PlayerId),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("persistence unavailable: {0}")]
    Unavailable(String),
}

/// Commands sent to the persistence background task
#[derive(Debug)]
pub enum PersistenceCommand {
    /// Save a snapshot of a player
    Save { player: Box<Player> },
    /// Load a player (response sent via oneshot channel)
    Load {
        player_id: PlayerId,
        response: oneshot::Sender<Result<Player, PersistenceError>>,
    },
    /// Stop the task once everything queued before it is done
    Shutdown,
}

/// Handle for sending commands to the persistence task
#[derive(Clone)]
pub struct PersistenceHandle {
    sender: mpsc::Sender<PersistenceCommand>,
}

impl PersistenceHandle {
    /// Queue a save (fire and forget - never blocks the caller)
    pub fn save(&self, player: Player) -> Result<(), PersistenceError> {
        let id = player.id;
        self.sender
            .try_send(PersistenceCommand::Save { player: Box::new(player) })
            .map_err(|e| {
                warn!("Dropping save for player {}: {}", id, e);
                PersistenceError::Unavailable(e.to_string())
            })
    }

    /// Load a player; used on connect, never from inside a tick
    pub async fn load(&self, player_id: PlayerId) -> Result<Player, PersistenceError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PersistenceCommand::Load { player_id, response: tx })
            .await
            .map_err(|_| PersistenceError::Unavailable("persistence task stopped".into()))?;
        rx.await
            .map_err(|_| PersistenceError::Unavailable("persistence task dropped the request".into()))?
    }

    /// Shutdown the persistence task, waiting for queued saves to finish
    pub async fn shutdown(&self) {
        let _ = self.sender.send(PersistenceCommand::Shutdown).await;
        self.sender.closed().await;
    }
}

/// Spawn the background task over any repository
pub fn spawn(repo: Arc<dyn PlayerRepository>) -> PersistenceHandle {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(persistence_task(repo, rx));
    info!("Persistence background task started");
    PersistenceHandle { sender: tx }
}

/// Connect to PostgreSQL and Redis and start the background task.
///
/// Redis is optional; without it loads go straight to the database.
pub async fn init(database_url: &str, redis_url: &str) -> Result<PersistenceHandle, PersistenceError> {
    let db = Database::connect(database_url).await?;
    db.ensure_schema().await?;
    info!("Connected to PostgreSQL");
    let postgres: Arc<dyn PlayerRepository> = Arc::new(PostgresRepository::new(db));

    let repo: Arc<dyn PlayerRepository> = match Cache::connect(redis_url).await {
        Ok(cache) => {
            info!("Connected to Redis");
            Arc::new(CachedRepository::new(postgres, cache))
        }
        Err(e) => {
            warn!("Redis unavailable ({}); running without a cache", e);
            postgres
        }
    };

    Ok(spawn(repo))
}

/// Background task that handles all persistence operations
async fn persistence_task(repo: Arc<dyn PlayerRepository>, mut rx: mpsc::Receiver<PersistenceCommand>) {
    info!("Persistence task running");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            PersistenceCommand::Save { player } => match repo.save(&player).await {
                Ok(()) => debug!("Saved player {}", player.id),
                Err(e) => error!("Failed to save player {}: {}", player.id, e),
            },

            PersistenceCommand::Load { player_id, response } => {
                let result = repo.load(player_id).await;
                match &result {
                    Ok(_) => info!("Loaded player {}", player_id),
                    Err(PersistenceError::NotFound(_)) => info!("No saved data for player {}", player_id),
                    Err(e) => error!("Failed to load player {}: {}", player_id, e),
                }
                let _ = response.send(result);
            }

            PersistenceCommand::Shutdown => {
                info!("Persistence task shutting down");
                break;
            }
        }
    }

    info!("Persistence task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentCatalog;
    use crate::entities::player::tests::test_player;

    #[tokio::test]
    async fn test_save_then_load_through_task() {
        let repo = Arc::new(MemoryRepository::new());
        let handle = spawn(repo.clone());

        let catalog = ContentCatalog::with_defaults();
        let mut player = test_player(&catalog);
        player.gold = 42;
        handle.save(player).unwrap();

        let loaded = handle.load(1).await.unwrap();
        assert_eq!(loaded.gold, 42);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_player_is_not_found() {
        let handle = spawn(Arc::new(MemoryRepository::new()));
        assert!(matches!(handle.load(77).await, Err(PersistenceError::NotFound(77))));
    }

    #[tokio::test]
    async fn test_stopped_task_reports_unavailable() {
        let handle = spawn(Arc::new(MemoryRepository::new()));
        handle.shutdown().await;
        // give the task a moment to exit and drop its receiver
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(matches!(handle.load(1).await, Err(PersistenceError::Unavailable(_))));
    }
}
