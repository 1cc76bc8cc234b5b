// [apps/orchestrator/src/handlers/locks.rs]
/*!
 * =================================================================
 * APARATO: EDIT LOCK HANDLER (V4.1)
 * CLASIFICACIÓN: API ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: ADQUISICIÓN, LIBERACIÓN Y LATIDO DE CANDADOS
 * =================================================================
 */

use crate::errors::CollabError;
use crate::services::LockFault;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use tracing::instrument;
use twinforge_domain_models::identity::ResolvedIdentity;
use twinforge_domain_models::lock::AcquireLockPayload;
use uuid::Uuid;

impl From<LockFault> for CollabError {
    fn from(fault: LockFault) -> Self {
        match fault {
            LockFault::Conflict { holder_user_id } => CollabError::Conflict { holder_user_id },
            LockFault::NotFound => CollabError::NotFound,
            LockFault::Expired => CollabError::Conflict { holder_user_id: None },
            LockFault::Backend(detail) => CollabError::Transient(detail),
        }
    }
}

/// Endpoint: POST /locks/acquire → {lock_id} | 409 con el portador vigente.
#[instrument(skip(application_state, identity, payload), fields(twin = %payload.twin_id))]
pub async fn handle_acquire(
    State(application_state): State<AppState>,
    Extension(identity): Extension<ResolvedIdentity>,
    Json(payload): Json<AcquireLockPayload>,
) -> Result<Json<serde_json::Value>, CollabError> {
    if payload.components.is_empty() {
        return Err(CollabError::Validation("components must not be empty".into()));
    }

    let lock_id = application_state
        .lock_manager
        .acquire(
            payload.twin_id,
            identity.user_id,
            identity.session_id,
            payload.components.into_iter().collect(),
            payload.lock_type,
            application_state.lock_manager.default_ttl_seconds(),
        )
        .await?;

    Ok(Json(json!({"lock_id": lock_id})))
}

/// Endpoint: DELETE /locks/{lock_id} → {status:"released"} | 404.
#[instrument(skip(application_state))]
pub async fn handle_release(
    State(application_state): State<AppState>,
    Path(lock_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, CollabError> {
    application_state.lock_manager.release(lock_id).await?;
    Ok(Json(json!({"status": "released"})))
}

/// Endpoint: POST /locks/{lock_id}/heartbeat → {status:"extended"}.
///
/// El cliente late cada 10 s, muy por debajo del TTL de 300 s; un
/// arrendamiento lapso responde conflicto y obliga a re-adquirir.
#[instrument(skip(application_state))]
pub async fn handle_heartbeat(
    State(application_state): State<AppState>,
    Path(lock_id): Path<Uuid>,
) -> Result<(StatusCode, Json<serde_json::Value>), CollabError> {
    match application_state.lock_manager.heartbeat(lock_id).await {
        Ok(()) => Ok((StatusCode::OK, Json(json!({"status": "extended"})))),
        Err(LockFault::Expired) => Ok((
            StatusCode::GONE,
            Json(json!({"status": "expired", "detail": "lease lapsed, re-acquire"})),
        )),
        Err(fault) => Err(fault.into()),
    }
}
