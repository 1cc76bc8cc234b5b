// [apps/maintenance-agent/src/loops/retrain.rs]
/*!
 * =================================================================
 * APARATO: ANOMALY MODEL RETRAIN LOOP (V4.1)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: ENTRENAMIENTO POR NODO SOBRE 30 DÍAS DE HISTORIA
 *
 * Admisión: al menos 100 muestras limpias (sin código de error) en la
 * ventana. El vector de características es (rpm, torque, vib_x, vib_y,
 * vib_z, temperatura, potencia) con nulos imputados a cero; la semilla
 * se deriva de la identidad del nodo para reproducibilidad entre ticks.
 * =================================================================
 */

use crate::agent::{node_training_seed, AgentState};
use chrono::{Duration as ChronoDuration, Utc};
use tracing::{debug, info, instrument};
use twinforge_domain_analytics::isolation::{feature_vector, IsolationForest};

/// Muestras limpias mínimas para entrenar el detector de un nodo.
pub const TRAINING_MIN_SAMPLES: usize = 100;

/// Ventana de historia de entrenamiento.
const TRAINING_WINDOW_DAYS: i64 = 30;

#[instrument(skip(state))]
pub async fn run_retrain_cycle(state: &AgentState) -> anyhow::Result<()> {
    let training_floor = Utc::now() - ChronoDuration::days(TRAINING_WINDOW_DAYS);
    let fleet = state.node_repository.online_nodes().await?;

    let mut trained_models = 0usize;
    for node in &fleet {
        let clean_history = state
            .telemetry_repository
            .window_since(node.node_id, training_floor, true)
            .await?;

        if clean_history.len() < TRAINING_MIN_SAMPLES {
            debug!(
                "🧠 [RETRAIN]: Node {} below admission floor ({} clean samples).",
                node.node_id,
                clean_history.len()
            );
            continue;
        }

        let training_matrix: Vec<Vec<f64>> =
            clean_history.iter().map(feature_vector).collect();

        if let Some(model) = IsolationForest::fit(&training_matrix, node_training_seed(node.node_id)) {
            // Reemplazo atómico de la entrada en la caché read-mostly.
            state.install_model(node.node_id, model);
            trained_models += 1;
        }
    }

    if trained_models > 0 {
        info!("🧠 [RETRAIN]: {} node models refreshed.", trained_models);
    }
    Ok(())
}
