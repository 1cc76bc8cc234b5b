// [apps/orchestrator/src/handlers/auth.rs]
/*!
 * =================================================================
 * APARATO: ACCESS NEGOTIATION HANDLER (V4.1)
 * CLASIFICACIÓN: API ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: REGISTRO, LOGIN Y TERMINACIÓN DE SESIONES
 *
 * El digest SHA-256 sustituye al bcrypt de producción (colaborador
 * externo, asumido correcto). El token de acceso es el identificador de
 * sesión opaco que el guardia perimetral resuelve contra user_sessions.
 * =================================================================
 */

use crate::errors::CollabError;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{info, instrument};
use twinforge_domain_models::identity::{
    AccessGrant, LoginPayload, RegisterOperatorPayload, ResolvedIdentity,
};

fn password_digest(raw_password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Endpoint: POST /auth/register
#[instrument(skip(application_state, payload), fields(username = %payload.username))]
pub async fn handle_register(
    State(application_state): State<AppState>,
    Json(payload): Json<RegisterOperatorPayload>,
) -> Result<(StatusCode, Json<AccessGrant>), CollabError> {
    if payload.username.trim().is_empty() || payload.email.trim().is_empty() {
        return Err(CollabError::Validation("username and email are required".into()));
    }
    if payload.password.len() < 8 {
        return Err(CollabError::Validation("password must span at least 8 characters".into()));
    }

    let operator = application_state
        .identity_repository
        .register_operator(
            payload.email.trim(),
            payload.username.trim(),
            &password_digest(&payload.password),
            payload.organization_id,
        )
        .await?;

    let session = application_state
        .identity_repository
        .create_session(operator.user_id, application_state.config.session_ttl_seconds)
        .await?;

    info!("🆕 [AUTH]: Operator {} registered and session opened.", operator.username);

    Ok((
        StatusCode::CREATED,
        Json(AccessGrant {
            access_token: session.session_id.to_string(),
            user_id: operator.user_id,
            session_id: session.session_id,
        }),
    ))
}

/// Endpoint: POST /auth/login
#[instrument(skip(application_state, payload), fields(username = %payload.username))]
pub async fn handle_login(
    State(application_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AccessGrant>, CollabError> {
    let (operator, stored_digest) = application_state
        .identity_repository
        .find_credentials(payload.username.trim())
        .await?
        .ok_or_else(|| CollabError::Auth("unknown operator or wrong password".into()))?;

    if !operator.is_active || stored_digest != password_digest(&payload.password) {
        return Err(CollabError::Auth("unknown operator or wrong password".into()));
    }

    application_state.identity_repository.record_login(operator.user_id).await?;

    let session = application_state
        .identity_repository
        .create_session(operator.user_id, application_state.config.session_ttl_seconds)
        .await?;

    Ok(Json(AccessGrant {
        access_token: session.session_id.to_string(),
        user_id: operator.user_id,
        session_id: session.session_id,
    }))
}

/// Endpoint: POST /auth/logout
///
/// Invalida la sesión y libera en cascada sus candados (la propiedad del
/// candado pertenece a la sesión, no al socket).
#[instrument(skip(application_state, identity), fields(session = %identity.session_id))]
pub async fn handle_logout(
    State(application_state): State<AppState>,
    Extension(identity): Extension<ResolvedIdentity>,
) -> Result<Json<serde_json::Value>, CollabError> {
    let released_locks =
        application_state.lock_manager.release_session(identity.session_id).await;

    application_state
        .identity_repository
        .invalidate_session(identity.session_id)
        .await?;

    application_state.connection_registry.detach(identity.session_id);

    info!(
        "👋 [AUTH]: Session {} terminated, {} locks released.",
        identity.session_id, released_locks
    );
    Ok(Json(json!({"status": "logged_out", "released_locks": released_locks})))
}
