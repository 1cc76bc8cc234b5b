// [apps/maintenance-agent/src/loops/mod.rs]
/*!
 * =================================================================
 * APARATO: CONTROL LOOP REGISTRY (V4.0)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: REGISTRO E IGNICIÓN DE LOS BUCLES PERIÓDICOS
 *
 * Cuatro bucles independientes más el tick de reentrenamiento; todos
 * capturan fallos por iteración: un nodo malo o un parpadeo de la base
 * jamás detienen el bucle.
 * =================================================================
 */

pub mod alerts;
pub mod monitor;
pub mod optimizer;
pub mod predictive;
pub mod retrain;

use crate::agent::AgentState;
use std::future::Future;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

/// Envuelve un ciclo en su daemon periódico con captura por iteración.
pub(crate) fn spawn_cycle_daemon<CycleFuture, CycleFn>(
    daemon_label: &'static str,
    cadence: Duration,
    state: AgentState,
    cycle: CycleFn,
) where
    CycleFn: Fn(AgentState) -> CycleFuture + Send + 'static,
    CycleFuture: Future<Output = anyhow::Result<()>> + Send,
{
    tokio::spawn(async move {
        let mut ticker = interval(cadence.max(Duration::from_secs(1)));
        info!("🔁 [{}]: Control loop initiated ({}s cadence).", daemon_label, cadence.as_secs());

        loop {
            ticker.tick().await;
            if let Err(iteration_fault) = cycle(state.clone()).await {
                warn!("⚠️ [{}]: Iteration failed, resuming next tick: {}", daemon_label, iteration_fault);
            }
        }
    });
}

/// Enciende los cinco daemons del agente.
pub fn ignite_all_loops(state: AgentState) {
    let config = state.config.clone();

    spawn_cycle_daemon(
        "TELEMETRY_MONITOR",
        Duration::from_secs(config.monitor_interval_seconds),
        state.clone(),
        |state| async move { monitor::run_monitor_cycle(&state).await },
    );

    spawn_cycle_daemon(
        "PREDICTIVE_LOOP",
        Duration::from_secs(config.predictive_interval_seconds),
        state.clone(),
        |state| async move { predictive::run_predictive_cycle(&state).await },
    );

    spawn_cycle_daemon(
        "SCHEDULE_OPTIMIZER",
        Duration::from_secs(config.optimizer_interval_seconds),
        state.clone(),
        |state| async move { optimizer::run_optimizer_cycle(&state).await },
    );

    spawn_cycle_daemon(
        "ALERT_DISPATCHER",
        Duration::from_secs(config.alert_interval_seconds),
        state.clone(),
        |state| async move { alerts::run_alert_cycle(&state).await },
    );

    spawn_cycle_daemon(
        "MODEL_RETRAIN",
        Duration::from_secs(config.retrain_interval_seconds),
        state,
        |state| async move { retrain::run_retrain_cycle(&state).await },
    );
}
