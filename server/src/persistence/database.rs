//! PostgreSQL storage for player records.

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use mud_shared::PlayerId;

use crate::entities::Player;
use super::repository::PlayerRepository;
use super::PersistenceError;

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to the database
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    /// Create the players table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS players (
                id BIGINT PRIMARY KEY,
                name TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Raw JSON record for a player
    pub async fn load_player_json(&self, player_id: i64) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query("SELECT data FROM players WHERE id = $1")
            .bind(player_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("data")))
    }

    pub async fn save_player_json(&self, player_id: i64, name: &str, json: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO players (id, name, data, updated_at)
             VALUES ($1, $2, $3, NOW())
             ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                data = EXCLUDED.data,
                updated_at = NOW()",
        )
        .bind(player_id)
        .bind(name)
        .bind(json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Player records stored as JSON in PostgreSQL
pub struct PostgresRepository {
    db: Database,
}

impl PostgresRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PlayerRepository for PostgresRepository {
    async fn load(&self, player_id: PlayerId) -> Result<Player, PersistenceError> {
        let json = self
            .db
            .load_player_json(player_id as i64)
            .await?
            .ok_or(PersistenceError::NotFound(player_id))?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn save(&self, player: &Player) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(player)?;
        self.db.save_player_json(player.id as i64, &player.name, &json).await?;
        Ok(())
    }
}
