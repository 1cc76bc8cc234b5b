// [apps/orchestrator/src/services/fanout_bridge.rs]
/*!
 * =================================================================
 * APARATO: INTER-INSTANCE FANOUT BRIDGE (V4.1)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: RELEVO DE FRAMES DE EDICIÓN ENTRE INSTANCIAS
 *
 * Suscrito al canal KV `twin:events`: los frames publicados por OTRAS
 * instancias se re-difunden a los suscriptores locales del gemelo. Los
 * frames propios se descartan por el sello de instancia (el pipeline ya
 * los entregó localmente).
 * =================================================================
 */

use crate::services::edit_pipeline::RelayEnvelope;
use crate::state::{AppState, TWIN_EVENTS_CHANNEL};
use tracing::{debug, info, warn};

pub async fn spawn_fanout_bridge(application_state: AppState) {
    tokio::spawn(async move {
        let mut subscription = match application_state.kv.subscribe(TWIN_EVENTS_CHANNEL).await {
            Ok(subscription) => subscription,
            Err(subscription_fault) => {
                warn!("⚠️ [FANOUT_BRIDGE]: Relay channel unavailable: {}", subscription_fault);
                return;
            }
        };

        info!("🌉 [FANOUT_BRIDGE]: Inter-instance relay online.");

        while let Some(raw_envelope) = subscription.recv().await {
            let envelope: RelayEnvelope = match serde_json::from_str(&raw_envelope) {
                Ok(envelope) => envelope,
                Err(decode_fault) => {
                    warn!("⚠️ [FANOUT_BRIDGE]: Undecodable relay frame: {}", decode_fault);
                    continue;
                }
            };

            // Sello de origen: los frames propios ya se difundieron localmente.
            if envelope.origin_instance == application_state.instance_id {
                continue;
            }

            let delivered = application_state
                .connection_registry
                .broadcast(envelope.twin_id, &envelope.frame, None)
                .await;
            debug!("🌉 [FANOUT_BRIDGE]: Foreign frame relayed to {} peers.", delivered);
        }

        warn!("💀 [FANOUT_BRIDGE]: Relay subscription terminated.");
    });
}
