// [libs/infra/db/src/client.rs]
/*!
 * =================================================================
 * APARATO: DATABASE CONNECTION GATE (V4.2)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ENLACE libSQL ACOTADO Y BOOTSTRAP DE ESQUEMA
 *
 * # Mathematical Proof (Bounded Concurrency):
 * La compuerta de semáforo limita los handles concurrentes al tamaño de
 * pool configurado. El guard devuelto posee permiso y conexión a la vez:
 * cancelar a un llamador en cualquier punto de suspensión devuelve el
 * permiso de forma determinista al soltarse el guard.
 *
 * # Mathematical Proof (In-Memory Consistency):
 * En modo RAM el cliente abre un ancla de persistencia ANTES del
 * bootstrap, garantizando que el esquema resida en el segmento de
 * memoria compartido visible para todos los hilos.
 * =================================================================
 */

use crate::errors::DbError;
use crate::schema::apply_full_schema;
use libsql::{Builder, Connection, Database};
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{error, info, instrument};

/// Límites duros del pool acotado.
const POOL_FLOOR: usize = 10;
const POOL_CEILING: usize = 100;

#[derive(Clone)]
pub struct DbClient {
    internal_database_driver: Arc<Database>,
    connection_gate: Arc<Semaphore>,
    /// Mantiene viva la base en modo memoria evitando que SQLite la purgue.
    _memory_persistence_anchor: Option<Arc<Connection>>,
}

/// Handle de conexión con permiso de compuerta adosado.
pub struct PooledConnection {
    connection: Connection,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.connection
    }
}

impl DbClient {
    #[instrument(skip(database_access_token))]
    pub async fn connect(
        database_connection_url: &str,
        database_access_token: Option<String>,
        max_connections: usize,
    ) -> Result<Self, DbError> {
        if database_connection_url.is_empty() {
            return Err(DbError::ConfigurationError("DATABASE_URL_UNDEFINED".into()));
        }

        info!("🔌 [DATABASE]: Initiating link synchronization to [{}]", database_connection_url);

        let is_remote = database_connection_url.starts_with("libsql://")
            || database_connection_url.starts_with("https://");

        let is_memory = database_connection_url.contains(":memory:")
            || database_connection_url.contains("mode=memory");

        let database_driver = if is_remote {
            let token = database_access_token.ok_or_else(|| {
                DbError::ConfigurationError("REMOTE_ACCESS_DENIED_TOKEN_MISSING".into())
            })?;
            Builder::new_remote(database_connection_url.to_string(), token).build().await
        } else {
            Builder::new_local(database_connection_url).build().await
        }
        .map_err(|fault| DbError::ConnectionError(format!("DRIVER_IGNITION_FAILURE: {}", fault)))?;

        let shared_driver = Arc::new(database_driver);
        let mut anchor = None;

        if is_memory {
            // En modo memoria el ancla se abre ANTES de cualquier otra operación.
            let anchor_connection = shared_driver
                .connect()
                .map_err(|fault| DbError::ConnectionError(format!("ANCHOR_FAULT: {}", fault)))?;

            apply_full_schema(&anchor_connection)
                .await
                .map_err(|fault| DbError::ConnectionError(format!("SCHEMA_SYNC_FAULT: {}", fault)))?;

            anchor = Some(Arc::new(anchor_connection));
            info!("⚓ [DATABASE]: Memory strata solidified and anchored.");
        } else {
            let bootstrap_connection = shared_driver
                .connect()
                .map_err(|fault| DbError::ConnectionError(format!("BOOTSTRAP_LINK_FAULT: {}", fault)))?;
            apply_full_schema(&bootstrap_connection)
                .await
                .map_err(|fault| DbError::ConnectionError(format!("SCHEMA_SYNC_FAULT: {}", fault)))?;
        }

        let bounded_pool_size = max_connections.clamp(POOL_FLOOR, POOL_CEILING);

        Ok(Self {
            internal_database_driver: shared_driver,
            connection_gate: Arc::new(Semaphore::new(bounded_pool_size)),
            _memory_persistence_anchor: anchor,
        })
    }

    /// Adquiere un handle de conexión. Suspende sin límite de tiempo hasta
    /// que la compuerta libere un permiso; la cancelación del llamador
    /// devuelve el permiso al instante.
    pub async fn acquire(&self) -> Result<PooledConnection, DbError> {
        let permit = self
            .connection_gate
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| DbError::ConnectionError("CONNECTION_GATE_CLOSED".into()))?;

        let connection = self.internal_database_driver.connect().map_err(|fault| {
            error!("⚠️ [POOL_FAULT]: Connection allocation failed: {}", fault);
            DbError::ConnectionError(fault.to_string())
        })?;

        Ok(PooledConnection { connection, _permit: permit })
    }

    /// Variante con plazo para llamadores que no pueden bloquear.
    pub async fn acquire_with_deadline(&self, deadline: Duration) -> Result<PooledConnection, DbError> {
        tokio::time::timeout(deadline, self.acquire())
            .await
            .map_err(|_| DbError::ConnectionError("CONNECTION_GATE_DEADLINE_EXCEEDED".into()))?
    }

    /// Sonda de vitalidad para el endpoint de salud.
    pub async fn probe(&self) -> bool {
        match self.acquire().await {
            Ok(connection) => connection.query("SELECT 1", ()).await.is_ok(),
            Err(_) => false,
        }
    }
}
