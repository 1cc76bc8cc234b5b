// [apps/orchestrator/src/handlers/telemetry.rs]
/*!
 * =================================================================
 * APARATO: TELEMETRY INGEST HANDLER (V4.1)
 * CLASIFICACIÓN: API ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: INGESTA SINGLE/BATCH Y AVISTAMIENTO DE NODOS
 *
 * Cada ingesta exitosa refresca el registro de flota (upsert de
 * avistamiento): los bucles del agente de mantenimiento descubren los
 * nodos en línea desde ahí.
 * =================================================================
 */

use crate::errors::CollabError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::json;
use std::collections::HashSet;
use tracing::instrument;
use twinforge_domain_models::telemetry::{IngestSamplePayload, TelemetrySample};

fn materialize_sample(payload: IngestSamplePayload) -> TelemetrySample {
    TelemetrySample {
        time: payload.time.unwrap_or_else(Utc::now),
        node_id: payload.node_id,
        rpm: payload.rpm,
        torque: payload.torque,
        vibration_x: payload.vibration_x,
        vibration_y: payload.vibration_y,
        vibration_z: payload.vibration_z,
        temperature: payload.temperature,
        power: payload.power,
        tool_wear: payload.tool_wear,
        error_code: payload.error_code,
        custom_metrics: payload.custom_metrics,
    }
}

/// Endpoint: POST /telemetry (muestra individual).
#[instrument(skip(application_state, payload), fields(node = %payload.node_id))]
pub async fn handle_ingest_single(
    State(application_state): State<AppState>,
    Json(payload): Json<IngestSamplePayload>,
) -> Result<Json<serde_json::Value>, CollabError> {
    let sample = materialize_sample(payload);

    application_state.telemetry_repository.insert_sample(&sample).await?;
    application_state.node_repository.upsert_seen(sample.node_id, sample.time).await?;

    Ok(Json(json!({"status": "ingested"})))
}

/// Endpoint: POST /telemetry/batch (ráfaga multi-fila bajo una conexión).
#[instrument(skip(application_state, payload), fields(count = payload.len()))]
pub async fn handle_ingest_batch(
    State(application_state): State<AppState>,
    Json(payload): Json<Vec<IngestSamplePayload>>,
) -> Result<Json<serde_json::Value>, CollabError> {
    if payload.is_empty() {
        return Err(CollabError::Validation("batch must contain at least one sample".into()));
    }

    let samples: Vec<TelemetrySample> = payload.into_iter().map(materialize_sample).collect();
    let ingested_count = application_state.telemetry_repository.insert_batch(&samples).await?;

    // Un upsert de avistamiento por nodo distinto de la ráfaga.
    let now = Utc::now();
    let distinct_nodes: HashSet<_> = samples.iter().map(|sample| sample.node_id).collect();
    for node_id in distinct_nodes {
        application_state.node_repository.upsert_seen(node_id, now).await?;
    }

    Ok(Json(json!({"status": "ingested", "count": ingested_count})))
}
