//! The player repository contract and its in-process adapters.

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use log::warn;
use tokio::sync::RwLock;

use mud_shared::PlayerId;

use crate::entities::Player;
use super::cache::Cache;
use super::PersistenceError;

/// Load and save whole player records
#[async_trait]
pub trait PlayerRepository: Send + Sync {
    async fn load(&self, player_id: PlayerId) -> Result<Player, PersistenceError>;
    async fn save(&self, player: &Player) -> Result<(), PersistenceError>;
}

/// Keeps players in memory; used in tests and when no database is reachable
#[derive(Default)]
pub struct MemoryRepository {
    players: RwLock<HashMap<PlayerId, Player>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.players.read().await.len()
    }
}

#[async_trait]
impl PlayerRepository for MemoryRepository {
    async fn load(&self, player_id: PlayerId) -> Result<Player, PersistenceError> {
        self.players
            .read()
            .await
            .get(&player_id)
            .cloned()
            .ok_or(PersistenceError::NotFound(player_id))
    }

    async fn save(&self, player: &Player) -> Result<(), PersistenceError> {
        self.players.write().await.insert(player.id, player.clone());
        Ok(())
    }
}

/// Read-through Redis cache in front of another repository
pub struct CachedRepository {
    inner: Arc<dyn PlayerRepository>,
    cache: Cache,
}

impl CachedRepository {
    pub fn new(inner: Arc<dyn PlayerRepository>, cache: Cache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl PlayerRepository for CachedRepository {
    async fn load(&self, player_id: PlayerId) -> Result<Player, PersistenceError> {
        match self.cache.load_player(player_id).await {
            Ok(Some(player)) => return Ok(player),
            Ok(None) => {}
            Err(e) => warn!("Cache read failed for player {}: {}", player_id, e),
        }

        let player = self.inner.load(player_id).await?;
        // Populate cache for next time
        if let Err(e) = self.cache.save_player(&player).await {
            warn!("Cache fill failed for player {}: {}", player_id, e);
        }
        Ok(player)
    }

    async fn save(&self, player: &Player) -> Result<(), PersistenceError> {
        // Save to Redis cache first (fast); the database is the record of truth
        if let Err(e) = self.cache.save_player(player).await {
            warn!("Failed to cache player {}: {}", player.id, e);
        }
        self.inner.save(player).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentCatalog;
    use crate::entities::player::tests::test_player;

    #[tokio::test]
    async fn test_memory_repository_overwrites() {
        let catalog = ContentCatalog::with_defaults();
        let repo = MemoryRepository::new();
        let mut player = test_player(&catalog);

        repo.save(&player).await.unwrap();
        player.level = 4;
        repo.save(&player).await.unwrap();

        assert_eq!(repo.len().await, 1);
        assert_eq!(repo.load(player.id).await.unwrap().level, 4);
    }

    #[tokio::test]
    async fn test_memory_repository_through_trait_object() {
        let repo: Arc<dyn PlayerRepository> = Arc::new(MemoryRepository::new());
        assert!(matches!(repo.load(3).await, Err(PersistenceError::NotFound(3))));
    }
}
