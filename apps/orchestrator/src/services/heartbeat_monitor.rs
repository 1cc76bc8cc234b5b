// [apps/orchestrator/src/services/heartbeat_monitor.rs]
/*!
 * =================================================================
 * APARATO: TRANSPORT HEARTBEAT MONITOR (V4.0)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: SONDA DE VIDA PERIÓDICA DE LOS ENLACES DUPLEX
 *
 * Cada H segundos envía un frame ping a todos los transportes adjuntos.
 * Doble propósito: detección de pares muertos y keep-alive contra
 * timeouts de NAT/proxy. Un envío fallido desengancha la sesión.
 * =================================================================
 */

use crate::state::AppState;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info};
use twinforge_domain_models::frames::ServerFrame;

pub async fn spawn_heartbeat_monitor(application_state: AppState) {
    let ping_cadence =
        Duration::from_secs(application_state.config.ws_heartbeat_interval_seconds.max(1));

    tokio::spawn(async move {
        let mut ping_ticker = interval(ping_cadence);
        let ping_frame = ServerFrame::Ping.to_wire();
        info!("💓 [HEARTBEAT_MONITOR]: Transport liveness probe initiated.");

        loop {
            ping_ticker.tick().await;

            let transports = application_state.connection_registry.transport_snapshot();
            if transports.is_empty() {
                continue;
            }

            let mut severed_sessions = Vec::new();
            for (session_id, transport) in transports {
                if transport.send_frame(&ping_frame).await.is_err() {
                    severed_sessions.push(session_id);
                }
            }

            for session_id in severed_sessions {
                debug!("💔 [HEARTBEAT_MONITOR]: Session {} failed ping, detaching.", session_id);
                application_state.connection_registry.detach(session_id);
            }
        }
    });
}
