// [libs/infra/db/src/repositories/edit.rs]
/*!
 * =================================================================
 * APARATO: EDIT OPERATION REPOSITORY (V4.1)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: LOG APPEND-ONLY Y MARCA DE AGUA DE RELOJES
 *
 * # Mathematical Proof (Total Order Authority):
 * op_seq es un entero autoincremental del motor: la secuencia de
 * inserción define el orden total de reproducción por gemelo. Cada reloj
 * almacenado es a su vez una fusión con la marca de agua previa, por lo
 * que el reloj de la última operación ES la marca de agua vigente.
 * =================================================================
 */

use super::{parse_stamp, parse_uuid, to_stamp};
use crate::client::DbClient;
use crate::errors::DbError;
use chrono::{DateTime, Utc};
use libsql::params;
use serde_json::Value;
use tracing::instrument;
use twinforge_domain_models::edit::{EditOperation, VectorClock};
use uuid::Uuid;

pub struct EditRepository {
    database_client: DbClient,
}

/// Borrador de operación previo al sellado de secuencia.
pub struct EditDraft {
    pub twin_id: Uuid,
    pub user_id: Uuid,
    pub op_type: String,
    pub component_path: String,
    pub data: Value,
    pub vector_clock: VectorClock,
    pub created_at: DateTime<Utc>,
}

impl EditRepository {
    pub fn new(client: DbClient) -> Self {
        Self { database_client: client }
    }

    /// Inserta la operación y sella su secuencia de orden total.
    #[instrument(skip(self, draft), fields(twin = %draft.twin_id))]
    pub async fn append_operation(&self, draft: EditDraft) -> Result<EditOperation, DbError> {
        let connection = self.database_client.acquire().await?;

        let op_id = Uuid::new_v4();
        let data_json = serde_json::to_string(&draft.data)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;
        let clock_json = serde_json::to_string(&draft.vector_clock)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;

        connection
            .execute(
                "INSERT INTO edit_operations (op_id, twin_id, user_id, op_type,
                    component_path, data, vector_clock, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    op_id.to_string(),
                    draft.twin_id.to_string(),
                    draft.user_id.to_string(),
                    draft.op_type.clone(),
                    draft.component_path.clone(),
                    data_json,
                    clock_json,
                    to_stamp(draft.created_at)
                ],
            )
            .await?;

        let op_seq = connection.last_insert_rowid();

        Ok(EditOperation {
            op_id,
            op_seq,
            twin_id: draft.twin_id,
            user_id: draft.user_id,
            op_type: draft.op_type,
            component_path: draft.component_path,
            data: draft.data,
            vector_clock: draft.vector_clock,
            created_at: draft.created_at,
        })
    }

    /// Marca de agua del gemelo: reloj de la última operación insertada.
    #[instrument(skip(self))]
    pub async fn high_watermark(&self, twin_id: Uuid) -> Result<VectorClock, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT vector_clock FROM edit_operations
                 WHERE twin_id = ?1 ORDER BY op_seq DESC LIMIT 1",
                params![twin_id.to_string()],
            )
            .await?;

        match rows.next().await? {
            None => Ok(VectorClock::default()),
            Some(row) => {
                let raw: String = row.get(0)?;
                serde_json::from_str(&raw).map_err(|fault| DbError::MappingError(fault.to_string()))
            }
        }
    }

    /// Historial de reproducción en orden de secuencia ascendente.
    #[instrument(skip(self))]
    pub async fn list_operations(
        &self,
        twin_id: Uuid,
        limit: i64,
    ) -> Result<Vec<EditOperation>, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT op_seq, op_id, twin_id, user_id, op_type, component_path,
                        data, vector_clock, created_at
                 FROM edit_operations WHERE twin_id = ?1 ORDER BY op_seq ASC LIMIT ?2",
                params![twin_id.to_string(), limit.max(0)],
            )
            .await?;

        let mut operations = Vec::new();
        while let Some(row) = rows.next().await? {
            let data_raw: String = row.get(6)?;
            let clock_raw: String = row.get(7)?;
            operations.push(EditOperation {
                op_seq: row.get(0)?,
                op_id: parse_uuid(&row.get::<String>(1)?)?,
                twin_id: parse_uuid(&row.get::<String>(2)?)?,
                user_id: parse_uuid(&row.get::<String>(3)?)?,
                op_type: row.get(4)?,
                component_path: row.get(5)?,
                data: serde_json::from_str(&data_raw)
                    .map_err(|fault| DbError::MappingError(fault.to_string()))?,
                vector_clock: serde_json::from_str(&clock_raw)
                    .map_err(|fault| DbError::MappingError(fault.to_string()))?,
                created_at: parse_stamp(&row.get::<String>(8)?)?,
            });
        }
        Ok(operations)
    }
}
