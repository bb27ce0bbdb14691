//! Redis cache for hot player records.

use redis::{aio::ConnectionManager, AsyncCommands};

use mud_shared::PlayerId;

use crate::entities::Player;
use super::PersistenceError;

/// Cache key prefix
const PLAYER_PREFIX: &str = "mud:player:";

/// TTL for cached data (1 hour)
const CACHE_TTL_SECONDS: u64 = 3600;

fn player_key(player_id: PlayerId) -> String {
    format!("{}{}", PLAYER_PREFIX, player_id)
}

/// Redis cache wrapper
#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
}

impl Cache {
    /// Connect to Redis
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    pub async fn save_player(&self, player: &Player) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(player)?;
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(player_key(player.id), json, CACHE_TTL_SECONDS).await?;
        Ok(())
    }

    /// Cached record, if present and readable
    pub async fn load_player(&self, player_id: PlayerId) -> Result<Option<Player>, PersistenceError> {
        let mut conn = self.conn.clone();
        let json: Option<String> = conn.get(player_key(player_id)).await?;
        match json {
            Some(j) => Ok(Some(serde_json::from_str(&j)?)),
            None => Ok(None),
        }
    }
}
