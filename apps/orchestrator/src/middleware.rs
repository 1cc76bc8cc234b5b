// [apps/orchestrator/src/middleware.rs]
/*!
 * =================================================================
 * APARATO: SESSION AUTHENTICATION GUARD (V4.1)
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: RESOLUCIÓN DE TOKENS E INYECCIÓN DE IDENTIDAD
 *
 * El token portador es el identificador opaco de la sesión (la firma
 * JWT real es colaborador externo). El guardia valida vigencia de la
 * sesión y bandera activa del operador en una sola consulta e inyecta
 * 'ResolvedIdentity' como extensión de la petición.
 * =================================================================
 */

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

pub async fn auth_guard(
    State(application_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let bearer_token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header_value| header_value.to_str().ok())
        .and_then(|header_value| header_value.strip_prefix("Bearer "));

    let Some(raw_token) = bearer_token else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    let Ok(session_id) = Uuid::parse_str(raw_token.trim()) else {
        warn!("❌ [AUTH_GUARD]: Malformed bearer token rejected.");
        return Err(StatusCode::UNAUTHORIZED);
    };

    match application_state.identity_repository.resolve_session(session_id).await {
        Ok(Some(identity)) => {
            debug!("👤 [AUTH_GUARD]: Operator {} authenticated.", identity.username);
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        Ok(None) => Err(StatusCode::UNAUTHORIZED),
        Err(resolution_fault) => {
            warn!("⚠️ [AUTH_GUARD]: Session resolution failed: {}", resolution_fault);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
