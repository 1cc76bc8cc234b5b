// [apps/orchestrator/src/state/mod.rs]
/*!
 * =================================================================
 * APARATO: APPLICATION STATE HUB (V4.1)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L4)
 * RESPONSABILIDAD: PLACA BASE DE REPOSITORIOS, REGISTROS Y GESTORES
 *
 * El estado global muta únicamente a través de singletons construidos
 * aquí y pasados por handle: no existen globals ambientales. Todo
 * handler y daemon recibe este contenedor clonable (Arc interiores).
 * =================================================================
 */

pub mod connection_registry;

use crate::config::OrchestratorConfig;
use crate::services::lock_manager::LockManager;
use connection_registry::ConnectionRegistry;
use std::sync::Arc;
use twinforge_infra_db::repositories::{
    EditRepository, IdentityRepository, LockRepository, NodeRepository, TelemetryRepository,
    TwinRepository,
};
use twinforge_infra_db::DbClient;
use twinforge_infra_kv::KvStratum;
use uuid::Uuid;

/// Canal de relevo inter-instancia de frames de edición.
pub const TWIN_EVENTS_CHANNEL: &str = "twin:events";

/// Contenedor de estado compartido (thread-safe) del orquestador.
#[derive(Clone)]
pub struct AppState {
    /// Identidad efímera de esta instancia (de-duplicación del relevo pub/sub).
    pub instance_id: Uuid,
    pub config: Arc<OrchestratorConfig>,
    /// Compuerta acotada de conexiones SQL.
    pub database_client: DbClient,
    /// Estrato KV distribuido (autoridad del estado de candados).
    pub kv: Arc<dyn KvStratum>,
    /// Índices en memoria de sesiones, usuarios y suscriptores por gemelo.
    pub connection_registry: Arc<ConnectionRegistry>,
    /// Gestor de candados de componente (CAS sobre el KV + sombra SQL).
    pub lock_manager: Arc<LockManager>,

    // --- SUPERFICIE TIPADA DE PERSISTENCIA ---
    pub identity_repository: Arc<IdentityRepository>,
    pub twin_repository: Arc<TwinRepository>,
    pub edit_repository: Arc<EditRepository>,
    pub telemetry_repository: Arc<TelemetryRepository>,
    pub node_repository: Arc<NodeRepository>,
    pub lock_repository: Arc<LockRepository>,
}

impl AppState {
    /// Forja el estado maestro inyectando los enlaces ya establecidos.
    pub fn new(
        database_client: DbClient,
        kv: Arc<dyn KvStratum>,
        config: OrchestratorConfig,
    ) -> Self {
        let lock_repository = Arc::new(LockRepository::new(database_client.clone()));

        let lock_manager = Arc::new(LockManager::new(
            kv.clone(),
            lock_repository.clone(),
            config.lock_ttl_seconds,
            config.lock_cas_retry_limit,
        ));

        Self {
            instance_id: Uuid::new_v4(),
            config: Arc::new(config),
            kv,
            connection_registry: Arc::new(ConnectionRegistry::new()),
            lock_manager,
            identity_repository: Arc::new(IdentityRepository::new(database_client.clone())),
            twin_repository: Arc::new(TwinRepository::new(database_client.clone())),
            edit_repository: Arc::new(EditRepository::new(database_client.clone())),
            telemetry_repository: Arc::new(TelemetryRepository::new(database_client.clone())),
            node_repository: Arc::new(NodeRepository::new(database_client.clone())),
            lock_repository,
            database_client,
        }
    }
}
