// [apps/orchestrator/src/handlers/edits.rs]
/*!
 * =================================================================
 * APARATO: EDIT OPERATION HANDLER (V4.0)
 * CLASIFICACIÓN: API ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: SUPERFICIE HTTP DEL PIPELINE DE EDICIONES
 * =================================================================
 */

use crate::errors::CollabError;
use crate::services::edit_pipeline;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use tracing::instrument;
use twinforge_domain_models::edit::SubmitEditPayload;
use twinforge_domain_models::identity::ResolvedIdentity;

/// Endpoint: POST /edit-operations → {operation_id}.
///
/// El receptor remoto puede observar la difusión antes de que esta
/// respuesta llegue al originador: no existe orden entre ambas.
#[instrument(skip(application_state, identity, payload), fields(twin = %payload.twin_id))]
pub async fn handle_submit(
    State(application_state): State<AppState>,
    Extension(identity): Extension<ResolvedIdentity>,
    Json(payload): Json<SubmitEditPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), CollabError> {
    let operation = edit_pipeline::submit_edit(&application_state, &identity, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({"operation_id": operation.op_id, "op_seq": operation.op_seq})),
    ))
}
