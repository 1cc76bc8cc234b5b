// [libs/infra/db/src/repositories/node.rs]
/*!
 * =================================================================
 * APARATO: MACHINE NODE REPOSITORY (V4.0)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: REGISTRO DE FLOTA Y VISIBILIDAD DE NODOS EN LÍNEA
 * =================================================================
 */

use super::{parse_opt_stamp, parse_uuid, to_stamp};
use crate::client::DbClient;
use crate::errors::DbError;
use chrono::{DateTime, Utc};
use libsql::params;
use tracing::instrument;
use twinforge_domain_models::telemetry::MachineNode;
use uuid::Uuid;

pub struct NodeRepository {
    database_client: DbClient,
}

impl NodeRepository {
    pub fn new(client: DbClient) -> Self {
        Self { database_client: client }
    }

    /// Upsert de avistamiento: la ingesta de telemetría mantiene vivo el
    /// registro de flota sin un alta explícita por nodo.
    #[instrument(skip(self))]
    pub async fn upsert_seen(&self, node_id: Uuid, seen_at: DateTime<Utc>) -> Result<(), DbError> {
        let connection = self.database_client.acquire().await?;
        connection
            .execute(
                "INSERT INTO machine_nodes (node_id, name, is_online, last_seen_at)
                 VALUES (?1, ?2, 1, ?3)
                 ON CONFLICT(node_id) DO UPDATE SET is_online = 1, last_seen_at = ?3",
                params![node_id.to_string(), format!("node-{}", node_id), to_stamp(seen_at)],
            )
            .await?;
        Ok(())
    }

    /// Marca fuera de línea los nodos sin avistamiento desde el umbral.
    pub async fn mark_offline_before(&self, threshold: DateTime<Utc>) -> Result<u64, DbError> {
        let connection = self.database_client.acquire().await?;
        let flipped = connection
            .execute(
                "UPDATE machine_nodes SET is_online = 0
                 WHERE is_online = 1 AND (last_seen_at IS NULL OR last_seen_at < ?1)",
                params![to_stamp(threshold)],
            )
            .await?;
        Ok(flipped)
    }

    /// Sella la fecha de último mantenimiento de un nodo.
    pub async fn record_maintenance(&self, node_id: Uuid, at: DateTime<Utc>) -> Result<bool, DbError> {
        let connection = self.database_client.acquire().await?;
        let updated = connection
            .execute(
                "UPDATE machine_nodes SET last_maintenance_at = ?1 WHERE node_id = ?2",
                params![to_stamp(at), node_id.to_string()],
            )
            .await?;
        Ok(updated > 0)
    }

    /// Flota en línea (sustrato de los bucles del agente).
    #[instrument(skip(self))]
    pub async fn online_nodes(&self) -> Result<Vec<MachineNode>, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT node_id, name, is_online, last_maintenance_at, last_seen_at
                 FROM machine_nodes WHERE is_online = 1",
                (),
            )
            .await?;

        let mut nodes = Vec::new();
        while let Some(row) = rows.next().await? {
            nodes.push(Self::map_node_row(&row)?);
        }
        Ok(nodes)
    }

    pub async fn fetch(&self, node_id: Uuid) -> Result<Option<MachineNode>, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT node_id, name, is_online, last_maintenance_at, last_seen_at
                 FROM machine_nodes WHERE node_id = ?1",
                params![node_id.to_string()],
            )
            .await?;

        match rows.next().await? {
            None => Ok(None),
            Some(row) => Ok(Some(Self::map_node_row(&row)?)),
        }
    }

    fn map_node_row(row: &libsql::Row) -> Result<MachineNode, DbError> {
        Ok(MachineNode {
            node_id: parse_uuid(&row.get::<String>(0)?)?,
            name: row.get(1)?,
            is_online: row.get::<i64>(2)? != 0,
            last_maintenance_at: parse_opt_stamp(row.get::<Option<String>>(3)?)?,
            last_seen_at: parse_opt_stamp(row.get::<Option<String>>(4)?)?,
        })
    }
}
