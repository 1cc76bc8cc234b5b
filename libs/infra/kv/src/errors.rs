// [libs/infra/kv/src/errors.rs]
/*!
 * =================================================================
 * APARATO: KV ERROR CATALOG (V4.0)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DEL ESTRATO KV
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KvError {
    /// Error de enlace físico o de autenticación contra el backend.
    #[error("[L3_KV_NET_FAULT]: KV_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    /// Comando rechazado o timeout del backend.
    #[error("[L3_KV_CMD_FAULT]: KV_COMMAND_REJECTED -> {0}")]
    CommandError(String),

    /// Fallo al abrir o sostener una suscripción pub/sub.
    #[error("[L3_KV_SUB_FAULT]: KV_SUBSCRIPTION_COLLAPSED -> {0}")]
    SubscriptionError(String),
}

impl From<redis::RedisError> for KvError {
    fn from(fault: redis::RedisError) -> Self {
        if fault.is_connection_refusal() || fault.is_connection_dropped() || fault.is_timeout() {
            KvError::ConnectionError(fault.to_string())
        } else {
            KvError::CommandError(fault.to_string())
        }
    }
}
