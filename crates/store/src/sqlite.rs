//! SQLite state store.
//!
//! One row per conversation in `agent_states`. The full [`AgentState`] is
//! kept as JSON in `state_json`; `status` and `version` are mirrored into
//! their own columns so the optimistic-concurrency check can be expressed
//! as `UPDATE … WHERE version = ?` inside the update transaction.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use stepwise_core::error::StoreError;
use stepwise_core::message::ConversationId;
use stepwise_core::state::{AgentState, AgentStatus};
use stepwise_core::store::{StatePatch, StateStore};
use tracing::{debug, info};

/// A SQLite-backed [`StateStore`].
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// Pass `":memory:"` for an ephemeral database; it is served from a
    /// single connection so every query sees the same data.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let in_memory = path.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .synchronous(SqliteSynchronous::Normal);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 4 })
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite state store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agent_states (
                conversation_id TEXT PRIMARY KEY NOT NULL,
                status          TEXT NOT NULL,
                version         INTEGER NOT NULL DEFAULT 0,
                state_json      TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("agent_states table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_agent_states_status ON agent_states(status)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("status index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Decode a row into a state; the `version` column wins over the JSON copy.
    fn row_to_state(
        id: &ConversationId,
        row: &sqlx::sqlite::SqliteRow,
    ) -> Result<AgentState, StoreError> {
        let json: String = row
            .try_get("state_json")
            .map_err(|e| StoreError::QueryFailed(format!("state_json column: {e}")))?;
        let version: i64 = row
            .try_get("version")
            .map_err(|e| StoreError::QueryFailed(format!("version column: {e}")))?;

        let mut state: AgentState =
            serde_json::from_str(&json).map_err(|e| StoreError::Corrupt {
                conversation_id: id.to_string(),
                reason: e.to_string(),
            })?;
        state.version = u64::try_from(version).map_err(|_| StoreError::Corrupt {
            conversation_id: id.to_string(),
            reason: format!("negative version {version}"),
        })?;
        Ok(state)
    }

    fn encode(state: &AgentState) -> Result<String, StoreError> {
        serde_json::to_string(state)
            .map_err(|e| StoreError::Storage(format!("State serialization: {e}")))
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn load(&self, id: &ConversationId) -> Result<Option<AgentState>, StoreError> {
        let row = sqlx::query(
            "SELECT state_json, version FROM agent_states WHERE conversation_id = ?1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("SELECT failed: {e}")))?;

        row.map(|r| Self::row_to_state(id, &r)).transpose()
    }

    async fn create(
        &self,
        id: &ConversationId,
        status: AgentStatus,
    ) -> Result<AgentState, StoreError> {
        let state = AgentState::new(id.clone(), status);
        let json = Self::encode(&state)?;

        sqlx::query(
            r#"
            INSERT INTO agent_states (conversation_id, status, version, state_json, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(conversation_id) DO UPDATE SET
                status = excluded.status,
                version = excluded.version,
                state_json = excluded.state_json,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(id.as_str())
        .bind(state.status.as_str())
        .bind(state.version as i64)
        .bind(&json)
        .bind(state.created_at.to_rfc3339())
        .bind(state.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT failed: {e}")))?;

        debug!(conversation_id = %id, "Created agent state");
        Ok(state)
    }

    async fn update(
        &self,
        id: &ConversationId,
        patch: StatePatch,
    ) -> Result<Option<AgentState>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("BEGIN failed: {e}")))?;

        let row = sqlx::query(
            "SELECT state_json, version FROM agent_states WHERE conversation_id = ?1",
        )
        .bind(id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("SELECT failed: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut state = Self::row_to_state(id, &row)?;
        let read_version = state.version;

        patch.check_version(&state)?;
        patch.apply_to(&mut state);
        let json = Self::encode(&state)?;

        let result = sqlx::query(
            r#"
            UPDATE agent_states
            SET status = ?1, version = ?2, state_json = ?3, updated_at = ?4
            WHERE conversation_id = ?5 AND version = ?6
            "#,
        )
        .bind(state.status.as_str())
        .bind(state.version as i64)
        .bind(&json)
        .bind(Utc::now().to_rfc3339())
        .bind(id.as_str())
        .bind(read_version as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Storage(format!("UPDATE failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::VersionConflict {
                conversation_id: id.to_string(),
                expected: read_version,
                actual: read_version + 1,
            });
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(conversation_id = %id, version = state.version, "Updated agent state");
        Ok(Some(state))
    }

    async fn delete(&self, id: &ConversationId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM agent_states WHERE conversation_id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE failed: {e}")))?;
        Ok(())
    }
}
