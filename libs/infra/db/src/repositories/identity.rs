// [libs/infra/db/src/repositories/identity.rs]
/*!
 * =================================================================
 * APARATO: IDENTITY REPOSITORY (V4.1)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: OPERADORES, SESIONES Y RESOLUCIÓN DE TOKENS
 *
 * Toda conexión duplex y todo candado referencian una sesión de esta
 * tabla; la resolución de identidad valida expiración y bandera activa
 * en una sola consulta con JOIN.
 * =================================================================
 */

use super::{optional_text, parse_opt_stamp, parse_stamp, parse_uuid, to_stamp};
use crate::client::DbClient;
use crate::errors::DbError;
use chrono::{Duration, Utc};
use libsql::params;
use tracing::{info, instrument};
use twinforge_domain_models::identity::{Operator, OperatorSession, ResolvedIdentity};
use uuid::Uuid;

pub struct IdentityRepository {
    database_client: DbClient,
}

impl IdentityRepository {
    pub fn new(client: DbClient) -> Self {
        Self { database_client: client }
    }

    /// Registra un operador nuevo. La unicidad de email y username se
    /// verifica antes de insertar para devolver un fallo semántico.
    #[instrument(skip(self, password_digest))]
    pub async fn register_operator(
        &self,
        email: &str,
        username: &str,
        password_digest: &str,
        organization_id: Option<Uuid>,
    ) -> Result<Operator, DbError> {
        let connection = self.database_client.acquire().await?;

        let mut existing = connection
            .query(
                "SELECT COUNT(*) FROM users WHERE username = ?1 OR email = ?2",
                params![username, email],
            )
            .await?;

        if let Some(row) = existing.next().await? {
            if row.get::<i64>(0)? > 0 {
                return Err(DbError::Duplicate(format!("operator [{}]", username)));
            }
        }

        let operator = Operator {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            username: username.to_string(),
            organization_id,
            is_active: true,
            created_at: Utc::now(),
            last_login_at: None,
        };

        connection
            .execute(
                "INSERT INTO users (user_id, email, username, password_digest, organization_id, is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
                params![
                    operator.user_id.to_string(),
                    operator.email.clone(),
                    operator.username.clone(),
                    password_digest,
                    optional_text(operator.organization_id.map(|id| id.to_string())),
                    to_stamp(operator.created_at)
                ],
            )
            .await?;

        info!("👤 [IDENTITY_REPO]: Operator {} crystallized.", operator.username);
        Ok(operator)
    }

    /// Recupera credenciales por username para la negociación de login.
    #[instrument(skip(self))]
    pub async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(Operator, String)>, DbError> {
        let connection = self.database_client.acquire().await?;

        let mut rows = connection
            .query(
                "SELECT user_id, email, username, organization_id, is_active, created_at,
                        last_login_at, password_digest
                 FROM users WHERE username = ?1",
                params![username],
            )
            .await?;

        match rows.next().await? {
            None => Ok(None),
            Some(row) => {
                let operator = Operator {
                    user_id: parse_uuid(&row.get::<String>(0)?)?,
                    email: row.get(1)?,
                    username: row.get(2)?,
                    organization_id: row
                        .get::<Option<String>>(3)?
                        .map(|raw| parse_uuid(&raw))
                        .transpose()?,
                    is_active: row.get::<i64>(4)? != 0,
                    created_at: parse_stamp(&row.get::<String>(5)?)?,
                    last_login_at: parse_opt_stamp(row.get::<Option<String>>(6)?)?,
                };
                let password_digest: String = row.get(7)?;
                Ok(Some((operator, password_digest)))
            }
        }
    }

    /// Sella la marca de último ingreso del operador.
    pub async fn record_login(&self, user_id: Uuid) -> Result<(), DbError> {
        let connection = self.database_client.acquire().await?;
        connection
            .execute(
                "UPDATE users SET last_login_at = ?1 WHERE user_id = ?2",
                params![to_stamp(Utc::now()), user_id.to_string()],
            )
            .await?;
        Ok(())
    }

    /// Abre una sesión nueva con la ventana de expiración dada.
    #[instrument(skip(self))]
    pub async fn create_session(
        &self,
        user_id: Uuid,
        ttl_seconds: i64,
    ) -> Result<OperatorSession, DbError> {
        let connection = self.database_client.acquire().await?;
        let now = Utc::now();

        let session = OperatorSession {
            session_id: Uuid::new_v4(),
            user_id,
            expires_at: now + Duration::seconds(ttl_seconds),
            created_at: now,
        };

        connection
            .execute(
                "INSERT INTO user_sessions (session_id, user_id, expires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    session.session_id.to_string(),
                    session.user_id.to_string(),
                    to_stamp(session.expires_at),
                    to_stamp(session.created_at)
                ],
            )
            .await?;

        Ok(session)
    }

    /// Resuelve un token de sesión a identidad viva: sesión vigente y
    /// operador activo, todo en una consulta.
    #[instrument(skip(self))]
    pub async fn resolve_session(
        &self,
        session_id: Uuid,
    ) -> Result<Option<ResolvedIdentity>, DbError> {
        let connection = self.database_client.acquire().await?;

        let mut rows = connection
            .query(
                "SELECT s.session_id, s.user_id, u.username
                 FROM user_sessions s
                 JOIN users u ON u.user_id = s.user_id
                 WHERE s.session_id = ?1 AND s.expires_at > ?2 AND u.is_active = 1",
                params![session_id.to_string(), to_stamp(Utc::now())],
            )
            .await?;

        match rows.next().await? {
            None => Ok(None),
            Some(row) => Ok(Some(ResolvedIdentity {
                session_id: parse_uuid(&row.get::<String>(0)?)?,
                user_id: parse_uuid(&row.get::<String>(1)?)?,
                username: row.get(2)?,
            })),
        }
    }

    /// Invalida explícitamente una sesión (logout). Silencioso si no existe.
    pub async fn invalidate_session(&self, session_id: Uuid) -> Result<bool, DbError> {
        let connection = self.database_client.acquire().await?;
        let removed = connection
            .execute(
                "DELETE FROM user_sessions WHERE session_id = ?1",
                params![session_id.to_string()],
            )
            .await?;
        Ok(removed > 0)
    }
}
