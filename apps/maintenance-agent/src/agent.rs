// [apps/maintenance-agent/src/agent.rs]
/*!
 * =================================================================
 * APARATO: FLEET AGENT STATE (V4.1)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L4)
 * RESPONSABILIDAD: PLACA BASE DE REPOSITORIOS, CACHÉ DE MODELOS Y CANAL
 *
 * La caché de modelos de anomalía es read-mostly: cada tick del monitor
 * lee bajo cerrojo compartido y el reentrenamiento reemplaza entradas
 * completas de forma atómica bajo cerrojo exclusivo.
 * =================================================================
 */

use crate::alert::AlertChannel;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use twinforge_domain_analytics::isolation::IsolationForest;
use twinforge_infra_db::repositories::{NodeRepository, TelemetryRepository, TicketRepository};
use twinforge_infra_db::DbClient;
use uuid::Uuid;

/// Perillas de cadencia de los bucles del agente.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub monitor_interval_seconds: u64,
    pub predictive_interval_seconds: u64,
    pub optimizer_interval_seconds: u64,
    pub alert_interval_seconds: u64,
    pub retrain_interval_seconds: u64,
    /// Umbral de silencio tras el cual un nodo cae fuera de línea (segundos).
    pub node_offline_after_seconds: i64,
    /// Incidentes priorizados por ciclo del optimizador.
    pub optimizer_top_n: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            monitor_interval_seconds: 60,
            predictive_interval_seconds: 3600,
            optimizer_interval_seconds: 3600,
            alert_interval_seconds: 300,
            retrain_interval_seconds: 86_400,
            node_offline_after_seconds: 600,
            optimizer_top_n: 10,
        }
    }
}

/// Contenedor de estado compartido del agente (handles clonables).
#[derive(Clone)]
pub struct AgentState {
    pub config: Arc<AgentConfig>,
    pub telemetry_repository: Arc<TelemetryRepository>,
    pub node_repository: Arc<NodeRepository>,
    pub ticket_repository: Arc<TicketRepository>,
    /// Modelos de aislamiento entrenados, uno por nodo físico.
    pub model_cache: Arc<RwLock<HashMap<Uuid, Arc<IsolationForest>>>>,
    /// Canal saliente de alertas (el transporte SMTP es colaborador externo).
    pub alert_channel: Arc<dyn AlertChannel>,
}

impl AgentState {
    pub fn new(
        database_client: DbClient,
        alert_channel: Arc<dyn AlertChannel>,
        config: AgentConfig,
    ) -> Self {
        Self {
            config: Arc::new(config),
            telemetry_repository: Arc::new(TelemetryRepository::new(database_client.clone())),
            node_repository: Arc::new(NodeRepository::new(database_client.clone())),
            ticket_repository: Arc::new(TicketRepository::new(database_client)),
            model_cache: Arc::new(RwLock::new(HashMap::new())),
            alert_channel,
        }
    }

    /// Modelo vigente de un nodo, si el detector ya entrenó.
    pub fn cached_model(&self, node_id: Uuid) -> Option<Arc<IsolationForest>> {
        match self.model_cache.read() {
            Ok(cache) => cache.get(&node_id).cloned(),
            Err(poison) => poison.into_inner().get(&node_id).cloned(),
        }
    }

    /// Reemplazo atómico de la entrada del nodo tras reentrenar.
    pub fn install_model(&self, node_id: Uuid, model: IsolationForest) {
        let mut cache = match self.model_cache.write() {
            Ok(cache) => cache,
            Err(poison) => poison.into_inner(),
        };
        cache.insert(node_id, Arc::new(model));
    }
}

/// Semilla determinista del bosque de un nodo, derivada de su identidad.
pub fn node_training_seed(node_id: Uuid) -> u64 {
    let bytes = node_id.as_bytes();
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}
