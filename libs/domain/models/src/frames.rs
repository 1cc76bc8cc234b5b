// [libs/domain/models/src/frames.rs]
/*!
 * =================================================================
 * APARATO: DUPLEX FRAME PROTOCOL (V4.1)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: UNIÓN DISCRIMINADA DE FRAMES DEL ENLACE DUPLEX
 *
 * Los frames viajan como objetos JSON con discriminador "type". La unión
 * es la única verdad del protocolo: el servidor y los clientes serializan
 * contra este contrato, nunca contra strings ad-hoc.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Frames emitidos por el cliente hacia el servidor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe { twin_id: Uuid },
    Unsubscribe { twin_id: Uuid },
    Heartbeat,
    CursorMove { twin_id: Uuid, position: Value },
}

/// Frames emitidos por el servidor hacia los clientes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Subscribed {
        twin_id: Uuid,
    },
    Pong,
    Ping,
    CursorUpdate {
        user_id: Uuid,
        position: Value,
    },
    EditOperation {
        operation_id: Uuid,
        user_id: Uuid,
        operation: Value,
    },
}

impl ServerFrame {
    /// Serializa el frame a su representación de cable.
    pub fn to_wire(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{\"type\":\"ping\"}".to_string())
    }
}

/// Código de cierre para sesiones inválidas o expiradas (RFC 6455: policy violation).
pub const CLOSE_CODE_INVALID_SESSION: u16 = 1008;
