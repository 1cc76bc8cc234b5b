// [apps/orchestrator/src/services/edit_pipeline.rs]
/*!
 * =================================================================
 * APARATO: EDIT OPERATION PIPELINE (V4.2)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: VALIDACIÓN DE CANDADO, SELLADO DE RELOJ Y DIFUSIÓN
 *
 * # Mathematical Proof (Causal Stamp):
 * El reloj sellado es max(reloj del llamador, marca de agua del gemelo)
 * elemento a elemento, más el incremento del contador propio. Como cada
 * operación almacenada fusiona la marca previa, el orden total de
 * inserción SQL es una extensión lineal del orden parcial causal.
 * =================================================================
 */

use crate::errors::CollabError;
use crate::state::{AppState, TWIN_EVENTS_CHANNEL};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use twinforge_domain_models::edit::{EditOperation, SubmitEditPayload};
use twinforge_domain_models::frames::ServerFrame;
use twinforge_domain_models::identity::ResolvedIdentity;
use twinforge_infra_db::repositories::edit::EditDraft;
use uuid::Uuid;

/// Sobre de relevo inter-instancia publicado en el canal KV.
#[derive(Debug, Serialize, Deserialize)]
pub struct RelayEnvelope {
    pub origin_instance: Uuid,
    pub twin_id: Uuid,
    pub frame: String,
}

/// Acepta, valida, persiste y difunde una operación de edición.
#[instrument(skip(state, identity, payload), fields(twin = %payload.twin_id, user = %identity.user_id))]
pub async fn submit_edit(
    state: &AppState,
    identity: &ResolvedIdentity,
    payload: SubmitEditPayload,
) -> Result<EditOperation, CollabError> {
    if payload.component_path.is_empty() {
        return Err(CollabError::Validation("component_path must not be empty".into()));
    }
    if payload.operation_type.is_empty() {
        return Err(CollabError::Validation("operation_type must not be empty".into()));
    }

    // 1. EL GEMELO DEBE EXISTIR
    state
        .twin_repository
        .fetch_twin(payload.twin_id)
        .await?
        .ok_or(CollabError::NotFound)?;

    // 2. VALIDACIÓN DE CANDADO: la sesión debe portar un candado activo
    // cuyo conjunto de componentes cubra la ruta editada. El registro del
    // KV es la autoridad; la sombra SQL no se consulta aquí.
    let covering = state
        .lock_manager
        .covering_holder(payload.twin_id, identity.session_id, &payload.component_path)
        .await
        .map_err(|fault| CollabError::Transient(fault.to_string()))?;

    if covering.is_none() {
        return Err(CollabError::Auth(format!(
            "no active lock covers component [{}]",
            payload.component_path
        )));
    }

    // 3. SELLADO DEL RELOJ VECTORIAL
    let mut stamped_clock = state.edit_repository.high_watermark(payload.twin_id).await?;
    if let Some(caller_clock) = &payload.vector_clock {
        stamped_clock.merge_assign(caller_clock);
    }
    stamped_clock.increment(identity.user_id);

    // 4. PERSISTENCIA APPEND-ONLY (autoridad del orden total)
    let operation = state
        .edit_repository
        .append_operation(EditDraft {
            twin_id: payload.twin_id,
            user_id: identity.user_id,
            op_type: payload.operation_type,
            component_path: payload.component_path,
            data: payload.operation_data,
            vector_clock: stamped_clock,
            created_at: Utc::now(),
        })
        .await?;

    // 5. DIFUSIÓN LOCAL (excluyendo al originador)
    let envelope_frame = ServerFrame::EditOperation {
        operation_id: operation.op_id,
        user_id: operation.user_id,
        operation: serde_json::to_value(&operation)
            .map_err(|fault| CollabError::Internal(fault.to_string()))?,
    }
    .to_wire();

    let delivered = state
        .connection_registry
        .broadcast(operation.twin_id, &envelope_frame, Some(identity.session_id))
        .await;
    debug!("📢 [EDIT_PIPELINE]: Operation {} fanned out to {} peers.", operation.op_id, delivered);

    // 6. RELEVO INTER-INSTANCIA (mejor esfuerzo, jamás bloquea la respuesta)
    let relay = RelayEnvelope {
        origin_instance: state.instance_id,
        twin_id: operation.twin_id,
        frame: envelope_frame,
    };
    match serde_json::to_string(&relay) {
        Ok(relay_payload) => {
            if let Err(publish_fault) =
                state.kv.publish(TWIN_EVENTS_CHANNEL, &relay_payload).await
            {
                warn!("⚠️ [EDIT_PIPELINE]: Relay publish failed: {}", publish_fault);
            }
        }
        Err(encode_fault) => {
            warn!("⚠️ [EDIT_PIPELINE]: Relay encode failed: {}", encode_fault);
        }
    }

    Ok(operation)
}
