// [libs/domain/models/src/telemetry.rs]
/*!
 * =================================================================
 * APARATO: FLEET TELEMETRY CONTRACTS (V4.0)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: NODOS FÍSICOS Y SERIE TEMPORAL DE SENSORES
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Unidad física bajo gestión de la flota.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineNode {
    pub node_id: Uuid,
    pub name: String,
    pub is_online: bool,
    pub last_maintenance_at: Option<DateTime<Utc>>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Muestra de telemetría append-only de la serie temporal.
/// Los campos de sensor son opcionales: un nodo degradado reporta parcial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub time: DateTime<Utc>,
    pub node_id: Uuid,
    pub rpm: Option<f64>,
    pub torque: Option<f64>,
    pub vibration_x: Option<f64>,
    pub vibration_y: Option<f64>,
    pub vibration_z: Option<f64>,
    pub temperature: Option<f64>,
    pub power: Option<f64>,
    pub tool_wear: Option<f64>,
    pub error_code: Option<i64>,
    /// Métricas ad-hoc serializadas verbatim a la columna JSON.
    #[serde(default)]
    pub custom_metrics: Option<Value>,
}

impl TelemetrySample {
    /// Magnitud de vibración √(x² + y² + z²) cuando los tres ejes reportan.
    pub fn vibration_magnitude(&self) -> Option<f64> {
        match (self.vibration_x, self.vibration_y, self.vibration_z) {
            (Some(x), Some(y), Some(z)) => Some((x * x + y * y + z * z).sqrt()),
            _ => None,
        }
    }

    /// Muestra limpia: sin código de error reportado.
    pub fn is_clean(&self) -> bool {
        matches!(self.error_code, None | Some(0))
    }
}

/// Payload de ingesta (single y batch). `time` se sella en el servidor
/// cuando el emisor lo omite.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestSamplePayload {
    pub node_id: Uuid,
    pub time: Option<DateTime<Utc>>,
    pub rpm: Option<f64>,
    pub torque: Option<f64>,
    pub vibration_x: Option<f64>,
    pub vibration_y: Option<f64>,
    pub vibration_z: Option<f64>,
    pub temperature: Option<f64>,
    pub power: Option<f64>,
    pub tool_wear: Option<f64>,
    pub error_code: Option<i64>,
    #[serde(default)]
    pub custom_metrics: Option<Value>,
}
