// [apps/orchestrator/src/routes.rs]
/*!
 * =================================================================
 * APARATO: ROUTING MATRIX (V4.2)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: TOPOLOGÍA HTTP, WS Y CAPAS DE SEGURIDAD
 *
 * Topología:
 * 1. /auth/register, /auth/login, /health y /ws/{session} son públicos
 *    (el socket valida su sesión en el upgrade y cierra 1008).
 * 2. Todo lo demás pasa por el guardia de sesión.
 * 3. La ingesta de telemetría obedece la perilla TELEMETRY_OPEN_INGEST.
 * =================================================================
 */

use crate::handlers::{auth, edits, health, locks, stream, telemetry, twins};
use crate::middleware::auth_guard;
use crate::state::AppState;
use axum::{
    http::{header, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(application_state: AppState) -> Router {
    // Escudo de red para el editor web y herramientas de operación.
    let network_security_shield = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    // ESTRATO COLABORATIVO (requiere sesión)
    let collaboration_stratum = Router::new()
        .route("/twins", post(twins::handle_create_twin).get(twins::handle_list_twins))
        .route("/twins/:twin_id", get(twins::handle_fetch_twin))
        .route("/twins/:twin_id/versions", post(twins::handle_create_version))
        .route("/twins/:twin_id/operations", get(twins::handle_list_operations))
        .route("/locks/acquire", post(locks::handle_acquire))
        .route("/locks/:lock_id", delete(locks::handle_release))
        .route("/locks/:lock_id/heartbeat", post(locks::handle_heartbeat))
        .route("/edit-operations", post(edits::handle_submit))
        .route("/auth/logout", post(auth::handle_logout))
        .layer(middleware::from_fn_with_state(application_state.clone(), auth_guard));

    // ESTRATO DE INGESTA: la política de autenticación es configurable
    // (decisión operativa; por defecto exige sesión).
    let telemetry_stratum = Router::new()
        .route("/telemetry", post(telemetry::handle_ingest_single))
        .route("/telemetry/batch", post(telemetry::handle_ingest_batch));

    let telemetry_stratum = if application_state.config.telemetry_open_ingest {
        telemetry_stratum
    } else {
        telemetry_stratum
            .layer(middleware::from_fn_with_state(application_state.clone(), auth_guard))
    };

    // COMPOSICIÓN GLOBAL
    Router::new()
        .route("/auth/register", post(auth::handle_register))
        .route("/auth/login", post(auth::handle_login))
        .route("/health", get(health::handle_health_probe))
        .route("/ws/:session_id", get(stream::handle_duplex_upgrade))
        .merge(collaboration_stratum)
        .merge(telemetry_stratum)
        .layer(TraceLayer::new_for_http())
        .layer(network_security_shield)
        .with_state(application_state)
}
