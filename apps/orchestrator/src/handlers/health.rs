// [apps/orchestrator/src/handlers/health.rs]
/*!
 * =================================================================
 * APARATO: HEALTH PROBE HANDLER (V4.0)
 * CLASIFICACIÓN: API ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: SONDA PÚBLICA DE VITALIDAD DE DEPENDENCIAS
 * =================================================================
 */

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

/// Endpoint: GET /health (público). Degrada a 503 si una dependencia cae.
pub async fn handle_health_probe(
    State(application_state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    let database_alive = application_state.database_client.probe().await;
    let kv_alive = application_state.kv.probe().await;

    let all_strata_alive = database_alive && kv_alive;
    let status_code =
        if all_strata_alive { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status_code,
        Json(json!({
            "status": if all_strata_alive { "ok" } else { "degraded" },
            "active_connections": application_state.connection_registry.active_connection_count(),
            "database": if database_alive { "up" } else { "down" },
            "redis": if kv_alive { "up" } else { "down" },
        })),
    )
}
