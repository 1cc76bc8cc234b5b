// [apps/maintenance-agent/src/loops/monitor.rs]
/*!
 * =================================================================
 * APARATO: TELEMETRY MONITOR LOOP (V4.2)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: SALUD POR NODO, UMBRALES Y CLASIFICACIÓN EN LÍNEA
 *
 * Cada tick: refresca la visibilidad de la flota, evalúa la ventana de
 * 5 minutos de cada nodo en línea, abre incidentes por cruce de umbral
 * (deduplicados) y clasifica la última muestra contra el modelo de
 * aislamiento del nodo.
 * =================================================================
 */

use crate::agent::AgentState;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use tracing::{debug, info, instrument};
use twinforge_domain_analytics::health::assess_node_health;
use twinforge_domain_analytics::isolation::feature_vector;
use twinforge_domain_analytics::recommend::threshold_drafts;
use twinforge_domain_models::ticket::{TicketDraft, TicketSeverity};

/// Ventana de evaluación de salud: 5 minutos, máximo 100 filas.
const ASSESSMENT_WINDOW_MINUTES: i64 = 5;
const ASSESSMENT_ROW_CEILING: i64 = 100;

#[instrument(skip(state))]
pub async fn run_monitor_cycle(state: &AgentState) -> anyhow::Result<()> {
    let now = Utc::now();

    // 1. VISIBILIDAD DE FLOTA: nodos silenciosos caen fuera de línea.
    let offline_threshold = now - ChronoDuration::seconds(state.config.node_offline_after_seconds);
    state.node_repository.mark_offline_before(offline_threshold).await?;

    let online_fleet = state.node_repository.online_nodes().await?;
    if online_fleet.is_empty() {
        return Ok(());
    }

    let mut opened_incidents = 0usize;

    for node in &online_fleet {
        // 2. EVALUACIÓN DE SALUD SOBRE LA VENTANA RECIENTE
        let window = state
            .telemetry_repository
            .recent_window(node.node_id, ChronoDuration::minutes(ASSESSMENT_WINDOW_MINUTES), ASSESSMENT_ROW_CEILING)
            .await?;

        if window.is_empty() {
            continue;
        }

        let health = assess_node_health(node.node_id, &window, node.last_maintenance_at, now);
        debug!(
            "🩺 [MONITOR]: Node {} health {:.1} (vib {:.3}g, temp {:.1}C).",
            node.node_id, health.health_score, health.vibration, health.temperature
        );

        // 3. INCIDENTES POR CRUCE DE UMBRAL (título = clave de dedup)
        for draft in threshold_drafts(&health) {
            if state.ticket_repository.create_deduplicated(draft).await?.is_some() {
                opened_incidents += 1;
            }
        }

        // 4. CLASIFICACIÓN EN LÍNEA CONTRA EL MODELO DEL NODO
        let Some(model) = state.cached_model(node.node_id) else {
            continue;
        };
        let Some(latest_sample) = state.telemetry_repository.latest_sample(node.node_id).await? else {
            continue;
        };

        let features = feature_vector(&latest_sample);
        if model.classify(&features).is_anomaly() {
            let anomaly_score = model.score(&features);
            let draft = TicketDraft {
                node_id: node.node_id,
                severity: TicketSeverity::High,
                title: "Anomalous telemetry pattern detected".to_string(),
                description: format!(
                    "Isolation scorer flagged the latest sample as an outlier (score {:.4}).",
                    anomaly_score
                ),
                diagnostic_data: Some(json!({
                    "anomaly_score": anomaly_score,
                    "rpm": latest_sample.rpm,
                    "temperature": latest_sample.temperature,
                })),
            };

            if state.ticket_repository.create_deduplicated(draft).await?.is_some() {
                opened_incidents += 1;
            }
        }
    }

    if opened_incidents > 0 {
        info!("🎫 [MONITOR]: Opened {} incidents across {} online nodes.", opened_incidents, online_fleet.len());
    }
    Ok(())
}
