// [apps/orchestrator/src/errors.rs]
/*!
 * =================================================================
 * APARATO: COLLABORATION ERROR BOUNDARY (V4.1)
 * CLASIFICACIÓN: API ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: TRADUCCIÓN DE FALLOS DE DOMINIO A CÓDIGOS HTTP
 *
 * Política de propagación: los handlers traducen en la frontera; los
 * daemons de fondo capturan por iteración y continúan. Los fallos
 * internos emiten un identificador de correlación al rastro.
 * =================================================================
 */

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use twinforge_infra_db::DbError;
use twinforge_infra_kv::KvError;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CollabError {
    /// Token inválido/expirado u operación sin candado habilitante → 401.
    #[error("[L4_AUTH_FAULT]: ACCESS_DENIED -> {0}")]
    Auth(String),

    /// Contención de candado o conflicto de versión → 409.
    /// Transporta al portador vigente para que la UI muestre "locked by X".
    #[error("[L4_CONFLICT_FAULT]: RESOURCE_CONTENTION")]
    Conflict { holder_user_id: Option<Uuid> },

    /// Gemelo, candado o incidente desconocido → 404.
    #[error("[L4_LOOKUP_FAULT]: IDENTIFIER_NOT_FOUND")]
    NotFound,

    /// Payload malformado o campos obligatorios ausentes → 400.
    #[error("[L4_VALIDATION_FAULT]: PAYLOAD_REJECTED -> {0}")]
    Validation(String),

    /// Agotamiento de pool o timeout del KV → 503; reintentar con jitter.
    #[error("[L4_TRANSIENT_FAULT]: BACKEND_UNAVAILABLE -> {0}")]
    Transient(String),

    /// Violación de invariante o estado inesperado → 500.
    #[error("[L4_INTERNAL_FAULT]: INVARIANT_VIOLATION -> {0}")]
    Internal(String),
}

impl From<DbError> for CollabError {
    fn from(fault: DbError) -> Self {
        match fault {
            DbError::NotFound => CollabError::NotFound,
            DbError::Duplicate(detail) => CollabError::Validation(detail),
            DbError::ConnectionError(detail) => CollabError::Transient(detail),
            other => CollabError::Internal(other.to_string()),
        }
    }
}

impl From<KvError> for CollabError {
    fn from(fault: KvError) -> Self {
        match fault {
            KvError::ConnectionError(detail) => CollabError::Transient(detail),
            other => CollabError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for CollabError {
    fn into_response(self) -> Response {
        match self {
            CollabError::Auth(detail) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "unauthorized", "detail": detail})),
            )
                .into_response(),

            CollabError::Conflict { holder_user_id } => (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": "conflict",
                    "detail": "resource is locked by another holder",
                    "holder_user_id": holder_user_id,
                })),
            )
                .into_response(),

            CollabError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "not_found"})),
            )
                .into_response(),

            CollabError::Validation(detail) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "validation", "detail": detail})),
            )
                .into_response(),

            CollabError::Transient(detail) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "transient", "detail": detail, "retry_after": 5})),
            )
                .into_response(),

            CollabError::Internal(detail) => {
                let correlation_id = Uuid::new_v4();
                error!("💀 [INTERNAL_FAULT] correlation={}: {}", correlation_id, detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "internal", "correlation_id": correlation_id})),
                )
                    .into_response()
            }
        }
    }
}
