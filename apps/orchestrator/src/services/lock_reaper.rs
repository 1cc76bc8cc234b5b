// [apps/orchestrator/src/services/lock_reaper.rs]
/*!
 * =================================================================
 * APARATO: STALE LOCK REAPER (V4.1)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: COSECHA DE CANDADOS HUÉRFANOS DE CLIENTES CAÍDOS
 *
 * Cubre el caso del cliente que dejó de latir: el TTL del KV ya lapsó
 * pero la fila sombra SQL quedó activa. Cada barrido marca inactivas las
 * filas cuyo latido o expiración vencieron y purga el residuo del KV.
 * =================================================================
 */

use crate::state::AppState;
use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

/// Lanza el daemon de cosecha. Captura fallos por iteración: un nodo malo
/// o un parpadeo de la base jamás detienen el bucle.
pub async fn spawn_lock_reaper(application_state: AppState) {
    let sweep_cadence =
        Duration::from_secs(application_state.config.lock_reaper_interval_seconds.max(1));
    let heartbeat_grace =
        ChronoDuration::seconds(application_state.config.lock_heartbeat_grace_seconds.max(1));

    tokio::spawn(async move {
        let mut sweep_ticker = interval(sweep_cadence);
        info!("💀 [LOCK_REAPER]: Stale lock harvesting daemon initiated.");

        loop {
            sweep_ticker.tick().await;

            let stale_locks = match application_state
                .lock_repository
                .stale_candidates(heartbeat_grace, Utc::now())
                .await
            {
                Ok(candidates) => candidates,
                Err(query_fault) => {
                    warn!("⚠️ [LOCK_REAPER]: Sweep query failed, retrying next tick: {}", query_fault);
                    continue;
                }
            };

            if stale_locks.is_empty() {
                continue;
            }

            let mut harvested = 0usize;
            for stale in &stale_locks {
                if let Err(kv_fault) = application_state
                    .lock_manager
                    .evict_holder(stale.twin_id, stale.lock_id)
                    .await
                {
                    warn!("⚠️ [LOCK_REAPER]: KV eviction failed for {}: {}", stale.lock_id, kv_fault);
                    continue;
                }

                match application_state.lock_repository.mark_inactive(stale.lock_id).await {
                    Ok(true) => harvested += 1,
                    Ok(false) => {}
                    Err(sql_fault) => {
                        warn!("⚠️ [LOCK_REAPER]: Shadow deactivation failed for {}: {}", stale.lock_id, sql_fault);
                    }
                }
            }

            if harvested > 0 {
                info!("💀 [LOCK_REAPER]: Harvested {} orphan locks.", harvested);
            }
        }
    });
}
