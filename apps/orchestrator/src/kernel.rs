// [apps/orchestrator/src/kernel.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR KERNEL (V4.2)
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L4)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN DE DAEMONS
 *
 * Actúa como la placa base donde se conectan los enlaces (SQL, KV), el
 * estado compartido, los daemons de fondo y el transporte HTTP.
 * =================================================================
 */

use crate::config::OrchestratorConfig;
use crate::routes::create_router;
use crate::services::{spawn_fanout_bridge, spawn_heartbeat_monitor, spawn_lock_reaper};
use crate::state::AppState;
use std::net::{IpAddr, SocketAddr};
use tracing::{error, info};
use twinforge_infra_db::DbClient;
use twinforge_infra_kv::connect_kv;

pub struct OrchestratorKernel {
    pub application_state: AppState,
}

impl OrchestratorKernel {
    /// Establece los enlaces de persistencia y KV antes de levantar servicios.
    pub async fn ignite(config: OrchestratorConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let database_client = DbClient::connect(
            &config.database_connection_url,
            config.database_access_token.clone(),
            config.db_max_connections,
        )
        .await?;

        let kv = connect_kv(&config.kv_connection_url).await?;

        Ok(Self { application_state: AppState::new(database_client, kv, config) })
    }

    /// Lanza los daemons de fondo y bloquea sirviendo el transporte HTTP.
    pub async fn launch(self) {
        let shared_state = self.application_state.clone();
        let listening_port = shared_state.config.listening_network_port;

        // --- 1. DAEMONS DE FONDO ---
        // Cosecha de candados huérfanos (sombra SQL + residuo KV).
        spawn_lock_reaper(shared_state.clone()).await;
        // Sonda de vida de transportes duplex.
        spawn_heartbeat_monitor(shared_state.clone()).await;
        // Relevo de frames entre instancias vía canal KV.
        spawn_fanout_bridge(shared_state.clone()).await;

        // --- 2. TRANSPORTE HTTP (AXUM) ---
        let router = create_router(shared_state);
        let bind_address = SocketAddr::new("0.0.0.0".parse::<IpAddr>().expect("static ip"), listening_port);

        info!("🚀 [KERNEL_ONLINE]: Collaboration core listening at {}", bind_address);

        let tcp_listener = match tokio::net::TcpListener::bind(bind_address).await {
            Ok(listener) => listener,
            Err(bind_fault) => {
                error!("💀 [KERNEL_COLLAPSE]: Failed to bind network port: {}", bind_fault);
                std::process::exit(1);
            }
        };

        if let Err(server_fault) = axum::serve(tcp_listener, router).await {
            error!("💀 [KERNEL_COLLAPSE]: Runtime failure: {}", server_fault);
            std::process::exit(1);
        }
    }
}
