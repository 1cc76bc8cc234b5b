// [apps/orchestrator/src/handlers/twins.rs]
/*!
 * =================================================================
 * APARATO: DIGITAL TWIN HANDLER (V4.1)
 * CLASIFICACIÓN: API ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: ALTA, LISTADO, VERSIONADO E HISTORIAL DE GEMELOS
 * =================================================================
 */

use crate::errors::CollabError;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use twinforge_domain_models::identity::ResolvedIdentity;
use twinforge_domain_models::twin::{CreateTwinPayload, CreateVersionPayload, DigitalTwin};
use uuid::Uuid;

/// Tope duro del tamaño de página del listado.
const LIST_LIMIT_CEILING: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: i64,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

/// Endpoint: POST /twins
#[instrument(skip(application_state, identity, payload), fields(owner = %identity.user_id))]
pub async fn handle_create_twin(
    State(application_state): State<AppState>,
    Extension(identity): Extension<ResolvedIdentity>,
    Json(payload): Json<CreateTwinPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), CollabError> {
    if payload.name.trim().is_empty() {
        return Err(CollabError::Validation("twin name is required".into()));
    }

    let (twin, genesis_version) = application_state
        .twin_repository
        .create_twin(identity.user_id, payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({"twin_id": twin.twin_id, "version_id": genesis_version.version_id})),
    ))
}

/// Endpoint: GET /twins?skip=&limit=
#[instrument(skip(application_state))]
pub async fn handle_list_twins(
    State(application_state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DigitalTwin>>, CollabError> {
    let page_limit = query.limit.unwrap_or(50).clamp(1, LIST_LIMIT_CEILING);
    let twins = application_state.twin_repository.list_twins(query.skip, page_limit).await?;
    Ok(Json(twins))
}

/// Endpoint: GET /twins/{id}
pub async fn handle_fetch_twin(
    State(application_state): State<AppState>,
    Path(twin_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, CollabError> {
    let twin = application_state
        .twin_repository
        .fetch_twin(twin_id)
        .await?
        .ok_or(CollabError::NotFound)?;

    let latest_version = application_state.twin_repository.latest_version(twin_id).await?;

    Ok(Json(json!({"twin": twin, "latest_version": latest_version})))
}

/// Endpoint: POST /twins/{id}/versions
#[instrument(skip(application_state, identity, payload), fields(twin = %twin_id))]
pub async fn handle_create_version(
    State(application_state): State<AppState>,
    Path(twin_id): Path<Uuid>,
    Extension(identity): Extension<ResolvedIdentity>,
    Json(payload): Json<CreateVersionPayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), CollabError> {
    if payload.commit_message.trim().is_empty() {
        return Err(CollabError::Validation("commit_message is required".into()));
    }

    let version = application_state
        .twin_repository
        .create_version(twin_id, identity.user_id, payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "version_id": version.version_id,
            "version_number": version.version_number,
        })),
    ))
}

/// Endpoint: GET /twins/{id}/operations?limit=
///
/// Historial de reproducción en orden de secuencia (clientes que
/// reconectan y deben ponerse al día).
pub async fn handle_list_operations(
    State(application_state): State<AppState>,
    Path(twin_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, CollabError> {
    application_state
        .twin_repository
        .fetch_twin(twin_id)
        .await?
        .ok_or(CollabError::NotFound)?;

    let replay_limit = query.limit.unwrap_or(500).clamp(1, 5_000);
    let operations =
        application_state.edit_repository.list_operations(twin_id, replay_limit).await?;

    Ok(Json(json!({"twin_id": twin_id, "operations": operations})))
}
