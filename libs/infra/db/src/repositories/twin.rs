// [libs/infra/db/src/repositories/twin.rs]
/*!
 * =================================================================
 * APARATO: DIGITAL TWIN REPOSITORY (V4.1)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: GEMELOS, VERSIONADO MONÓTONO Y MARCADOR is_latest
 *
 * # Mathematical Proof (Version Linearity):
 * La creación de una versión ejecuta bajo una única transacción: limpia
 * el marcador is_latest, inserta la instantánea nueva y avanza
 * version_number en el gemelo. Invariante resultante: exactamente una
 * versión por gemelo porta is_latest en todo instante observable.
 * =================================================================
 */

use super::{optional_text, parse_stamp, parse_uuid, to_stamp};
use crate::client::DbClient;
use crate::errors::DbError;
use chrono::Utc;
use libsql::params;
use tracing::{info, instrument};
use twinforge_domain_models::twin::{CreateTwinPayload, CreateVersionPayload, DigitalTwin, TwinVersion};
use uuid::Uuid;

pub struct TwinRepository {
    database_client: DbClient,
}

impl TwinRepository {
    pub fn new(client: DbClient) -> Self {
        Self { database_client: client }
    }

    /// Crea el gemelo junto con su versión génesis (number = 1, is_latest).
    #[instrument(skip(self, payload))]
    pub async fn create_twin(
        &self,
        owner_user_id: Uuid,
        payload: CreateTwinPayload,
    ) -> Result<(DigitalTwin, TwinVersion), DbError> {
        let connection = self.database_client.acquire().await?;
        let now = Utc::now();

        let twin = DigitalTwin {
            twin_id: Uuid::new_v4(),
            name: payload.name,
            description: payload.description,
            twin_type: payload.twin_type,
            owner_user_id,
            version_number: 1,
            tags: payload.tags,
            created_at: now,
        };

        let genesis_version = TwinVersion {
            version_id: Uuid::new_v4(),
            twin_id: twin.twin_id,
            version_number: 1,
            created_by: owner_user_id,
            commit_message: "genesis".to_string(),
            model_url: None,
            model_format: None,
            properties: payload.properties,
            is_latest: true,
            created_at: now,
        };

        let tags_json = serde_json::to_string(&twin.tags)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;
        let properties_json = serde_json::to_string(&genesis_version.properties)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;

        let transaction = connection.transaction().await?;

        transaction
            .execute(
                "INSERT INTO digital_twins (twin_id, name, description, twin_type,
                    owner_user_id, version_number, tags, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7)",
                params![
                    twin.twin_id.to_string(),
                    twin.name.clone(),
                    optional_text(twin.description.clone()),
                    twin.twin_type.clone(),
                    twin.owner_user_id.to_string(),
                    tags_json,
                    to_stamp(now)
                ],
            )
            .await?;

        transaction
            .execute(
                "INSERT INTO twin_versions (version_id, twin_id, version_number, created_by,
                    commit_message, model_url, model_format, properties, is_latest, created_at)
                 VALUES (?1, ?2, 1, ?3, 'genesis', NULL, NULL, ?4, 1, ?5)",
                params![
                    genesis_version.version_id.to_string(),
                    twin.twin_id.to_string(),
                    owner_user_id.to_string(),
                    properties_json,
                    to_stamp(now)
                ],
            )
            .await?;

        transaction.commit().await?;

        info!("🌐 [TWIN_REPO]: Twin {} crystallized at version 1.", twin.twin_id);
        Ok((twin, genesis_version))
    }

    /// Crea una versión nueva y reubica el marcador is_latest atómicamente.
    #[instrument(skip(self, payload))]
    pub async fn create_version(
        &self,
        twin_id: Uuid,
        created_by: Uuid,
        payload: CreateVersionPayload,
    ) -> Result<TwinVersion, DbError> {
        let connection = self.database_client.acquire().await?;
        let now = Utc::now();

        let properties_json = serde_json::to_string(&payload.properties)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;

        let transaction = connection.transaction().await?;

        let mut rows = transaction
            .query(
                "SELECT version_number FROM digital_twins WHERE twin_id = ?1",
                params![twin_id.to_string()],
            )
            .await?;

        let current_number: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => return Err(DbError::NotFound),
        };
        let next_number = current_number + 1;

        transaction
            .execute(
                "UPDATE twin_versions SET is_latest = 0 WHERE twin_id = ?1 AND is_latest = 1",
                params![twin_id.to_string()],
            )
            .await?;

        let version = TwinVersion {
            version_id: Uuid::new_v4(),
            twin_id,
            version_number: next_number,
            created_by,
            commit_message: payload.commit_message,
            model_url: payload.model_url,
            model_format: payload.model_format,
            properties: payload.properties,
            is_latest: true,
            created_at: now,
        };

        transaction
            .execute(
                "INSERT INTO twin_versions (version_id, twin_id, version_number, created_by,
                    commit_message, model_url, model_format, properties, is_latest, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9)",
                params![
                    version.version_id.to_string(),
                    twin_id.to_string(),
                    next_number,
                    created_by.to_string(),
                    version.commit_message.clone(),
                    optional_text(version.model_url.clone()),
                    optional_text(version.model_format.clone()),
                    properties_json,
                    to_stamp(now)
                ],
            )
            .await?;

        transaction
            .execute(
                "UPDATE digital_twins SET version_number = ?1 WHERE twin_id = ?2",
                params![next_number, twin_id.to_string()],
            )
            .await?;

        transaction.commit().await?;

        info!("📐 [TWIN_REPO]: Twin {} advanced to version {}.", twin_id, version.version_number);
        Ok(version)
    }

    #[instrument(skip(self))]
    pub async fn fetch_twin(&self, twin_id: Uuid) -> Result<Option<DigitalTwin>, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT twin_id, name, description, twin_type, owner_user_id,
                        version_number, tags, created_at
                 FROM digital_twins WHERE twin_id = ?1",
                params![twin_id.to_string()],
            )
            .await?;

        match rows.next().await? {
            None => Ok(None),
            Some(row) => Ok(Some(Self::map_twin_row(&row)?)),
        }
    }

    /// Lista paginada para la superficie HTTP (`?skip=&limit=`).
    #[instrument(skip(self))]
    pub async fn list_twins(&self, skip: i64, limit: i64) -> Result<Vec<DigitalTwin>, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT twin_id, name, description, twin_type, owner_user_id,
                        version_number, tags, created_at
                 FROM digital_twins ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
                params![limit.max(0), skip.max(0)],
            )
            .await?;

        let mut twins = Vec::new();
        while let Some(row) = rows.next().await? {
            twins.push(Self::map_twin_row(&row)?);
        }
        Ok(twins)
    }

    /// Instantánea vigente (is_latest) de un gemelo.
    pub async fn latest_version(&self, twin_id: Uuid) -> Result<Option<TwinVersion>, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT version_id, twin_id, version_number, created_by, commit_message,
                        model_url, model_format, properties, is_latest, created_at
                 FROM twin_versions WHERE twin_id = ?1 AND is_latest = 1",
                params![twin_id.to_string()],
            )
            .await?;

        match rows.next().await? {
            None => Ok(None),
            Some(row) => {
                let properties_raw: String = row.get(7)?;
                Ok(Some(TwinVersion {
                    version_id: parse_uuid(&row.get::<String>(0)?)?,
                    twin_id: parse_uuid(&row.get::<String>(1)?)?,
                    version_number: row.get(2)?,
                    created_by: parse_uuid(&row.get::<String>(3)?)?,
                    commit_message: row.get(4)?,
                    model_url: row.get(5)?,
                    model_format: row.get(6)?,
                    properties: serde_json::from_str(&properties_raw)
                        .map_err(|fault| DbError::MappingError(fault.to_string()))?,
                    is_latest: row.get::<i64>(8)? != 0,
                    created_at: parse_stamp(&row.get::<String>(9)?)?,
                }))
            }
        }
    }

    /// Conteo de versiones con marcador vigente (auditoría del invariante).
    pub async fn latest_marker_count(&self, twin_id: Uuid) -> Result<i64, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT COUNT(*) FROM twin_versions WHERE twin_id = ?1 AND is_latest = 1",
                params![twin_id.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    fn map_twin_row(row: &libsql::Row) -> Result<DigitalTwin, DbError> {
        let tags_raw: String = row.get(6)?;
        Ok(DigitalTwin {
            twin_id: parse_uuid(&row.get::<String>(0)?)?,
            name: row.get(1)?,
            description: row.get(2)?,
            twin_type: row.get(3)?,
            owner_user_id: parse_uuid(&row.get::<String>(4)?)?,
            version_number: row.get(5)?,
            tags: serde_json::from_str(&tags_raw)
                .map_err(|fault| DbError::MappingError(fault.to_string()))?,
            created_at: parse_stamp(&row.get::<String>(7)?)?,
        })
    }
}
