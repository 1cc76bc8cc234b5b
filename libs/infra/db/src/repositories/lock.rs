// [libs/infra/db/src/repositories/lock.rs]
/*!
 * =================================================================
 * APARATO: EDIT LOCK SHADOW REPOSITORY (V4.1)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: FILA SOMBRA DURABLE DE CANDADOS Y SUSTRATO DEL REAPER
 *
 * La autoridad del estado de candados vive en el KV; esta tabla es la
 * sombra de auditoría. El camino caliente de conflicto jamás la consulta:
 * la leen release/heartbeat (resolución de twin_id) y el reaper.
 * =================================================================
 */

use super::{parse_stamp, parse_uuid, to_stamp};
use crate::client::DbClient;
use crate::errors::DbError;
use chrono::{DateTime, Duration, Utc};
use libsql::params;
use tracing::instrument;
use twinforge_domain_models::lock::{EditLock, LockType};

use uuid::Uuid;

pub struct LockRepository {
    database_client: DbClient,
}

impl LockRepository {
    pub fn new(client: DbClient) -> Self {
        Self { database_client: client }
    }

    /// Inserta la fila sombra de un candado recién instalado en el KV.
    #[instrument(skip(self, lock))]
    pub async fn insert_shadow(&self, lock: &EditLock) -> Result<(), DbError> {
        let connection = self.database_client.acquire().await?;

        let components_json = serde_json::to_string(&lock.components)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;
        let lock_type_literal = serde_json::to_string(&lock.lock_type)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?
            .trim_matches('"')
            .to_string();

        connection
            .execute(
                "INSERT INTO edit_locks (lock_id, twin_id, user_id, session_id, components,
                    lock_type, acquired_at, expires_at, heartbeat_at, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1)",
                params![
                    lock.lock_id.to_string(),
                    lock.twin_id.to_string(),
                    lock.user_id.to_string(),
                    lock.session_id.to_string(),
                    components_json,
                    lock_type_literal,
                    to_stamp(lock.acquired_at),
                    to_stamp(lock.expires_at),
                    to_stamp(lock.heartbeat_at)
                ],
            )
            .await?;
        Ok(())
    }

    /// Localiza la fila sombra de un candado (resolución lock_id → twin).
    #[instrument(skip(self))]
    pub async fn find_shadow(&self, lock_id: Uuid) -> Result<Option<EditLock>, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT lock_id, twin_id, user_id, session_id, components, lock_type,
                        acquired_at, expires_at, heartbeat_at, is_active
                 FROM edit_locks WHERE lock_id = ?1",
                params![lock_id.to_string()],
            )
            .await?;

        match rows.next().await? {
            None => Ok(None),
            Some(row) => Ok(Some(Self::map_lock_row(&row)?)),
        }
    }

    /// Marca la fila como inactiva (release o cosecha del reaper).
    pub async fn mark_inactive(&self, lock_id: Uuid) -> Result<bool, DbError> {
        let connection = self.database_client.acquire().await?;
        let updated = connection
            .execute(
                "UPDATE edit_locks SET is_active = 0 WHERE lock_id = ?1 AND is_active = 1",
                params![lock_id.to_string()],
            )
            .await?;
        Ok(updated > 0)
    }

    /// Sella el latido y la nueva expiración de un candado activo.
    pub async fn touch_heartbeat(
        &self,
        lock_id: Uuid,
        heartbeat_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let connection = self.database_client.acquire().await?;
        let updated = connection
            .execute(
                "UPDATE edit_locks SET heartbeat_at = ?1, expires_at = ?2
                 WHERE lock_id = ?3 AND is_active = 1",
                params![to_stamp(heartbeat_at), to_stamp(expires_at), lock_id.to_string()],
            )
            .await?;
        Ok(updated > 0)
    }

    /// Candados activos cuyo latido o expiración ya lapsaron (presa del reaper).
    #[instrument(skip(self))]
    pub async fn stale_candidates(
        &self,
        heartbeat_grace: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<EditLock>, DbError> {
        let connection = self.database_client.acquire().await?;
        let heartbeat_floor = to_stamp(now - heartbeat_grace);

        let mut rows = connection
            .query(
                "SELECT lock_id, twin_id, user_id, session_id, components, lock_type,
                        acquired_at, expires_at, heartbeat_at, is_active
                 FROM edit_locks
                 WHERE is_active = 1 AND (heartbeat_at < ?1 OR expires_at < ?2)",
                params![heartbeat_floor, to_stamp(now)],
            )
            .await?;

        let mut stale = Vec::new();
        while let Some(row) = rows.next().await? {
            stale.push(Self::map_lock_row(&row)?);
        }
        Ok(stale)
    }

    /// Candados activos de una sesión (liberación en logout/desconexión).
    pub async fn active_for_session(&self, session_id: Uuid) -> Result<Vec<EditLock>, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT lock_id, twin_id, user_id, session_id, components, lock_type,
                        acquired_at, expires_at, heartbeat_at, is_active
                 FROM edit_locks WHERE session_id = ?1 AND is_active = 1",
                params![session_id.to_string()],
            )
            .await?;

        let mut locks = Vec::new();
        while let Some(row) = rows.next().await? {
            locks.push(Self::map_lock_row(&row)?);
        }
        Ok(locks)
    }

    fn map_lock_row(row: &libsql::Row) -> Result<EditLock, DbError> {
        let components_raw: String = row.get(4)?;
        let lock_type_raw: String = row.get(5)?;

        let lock_type: LockType = serde_json::from_str(&format!("\"{}\"", lock_type_raw))
            .map_err(|fault| DbError::MappingError(format!("LOCK_TYPE_DRIFT: {}", fault)))?;

        Ok(EditLock {
            lock_id: parse_uuid(&row.get::<String>(0)?)?,
            twin_id: parse_uuid(&row.get::<String>(1)?)?,
            user_id: parse_uuid(&row.get::<String>(2)?)?,
            session_id: parse_uuid(&row.get::<String>(3)?)?,
            components: serde_json::from_str(&components_raw)
                .map_err(|fault| DbError::MappingError(fault.to_string()))?,
            lock_type,
            acquired_at: parse_stamp(&row.get::<String>(6)?)?,
            expires_at: parse_stamp(&row.get::<String>(7)?)?,
            heartbeat_at: parse_stamp(&row.get::<String>(8)?)?,
            is_active: row.get::<i64>(9)? != 0,
        })
    }
}
