// [libs/domain/models/src/identity.rs]
/*!
 * =================================================================
 * APARATO: IDENTITY CONTRACTS (V4.0)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: OPERADORES, SESIONES Y NEGOCIACIÓN DE ACCESO
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operador registrado del sistema. Inmutable tras su creación salvo
/// `last_login_at` e `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operator {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    /// Organización a la que pertenece el operador (opcional).
    pub organization_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Sesión viva de un operador. Toda conexión duplex y todo candado de
/// edición referencian una sesión; su expiración los invalida en cascada.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorSession {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OperatorSession {
    /// Evalúa si la sesión sigue dentro de su ventana de validez.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Identidad resuelta por el guardia perimetral e inyectada en cada petición.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub username: String,
}

// --- PAYLOADS DE NEGOCIACIÓN DE ACCESO ---

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterOperatorPayload {
    pub email: String,
    pub username: String,
    pub password: String,
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}

/// Concesión de acceso devuelta por `/auth/register` y `/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessGrant {
    pub access_token: String,
    pub user_id: Uuid,
    pub session_id: Uuid,
}
