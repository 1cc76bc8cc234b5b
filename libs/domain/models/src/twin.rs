// [libs/domain/models/src/twin.rs]
/*!
 * =================================================================
 * APARATO: DIGITAL TWIN CONTRACTS (V4.0)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: ARTEFACTO EDITABLE Y SUS INSTANTÁNEAS VERSIONADAS
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Gemelo digital: el artefacto editable. `version_number` crece de forma
/// monótona y exactamente una versión por gemelo porta `is_latest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitalTwin {
    pub twin_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub twin_type: String,
    pub owner_user_id: Uuid,
    pub version_number: i64,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Instantánea inmutable de las propiedades de un gemelo en un punto del
/// tiempo. El marcador `is_latest` se reubica bajo una única transacción.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwinVersion {
    pub version_id: Uuid,
    pub twin_id: Uuid,
    pub version_number: i64,
    pub created_by: Uuid,
    pub commit_message: String,
    pub model_url: Option<String>,
    pub model_format: Option<String>,
    /// Árbol de propiedades serializado verbatim hacia la columna JSON.
    pub properties: Value,
    pub is_latest: bool,
    pub created_at: DateTime<Utc>,
}

// --- PAYLOADS DE LA SUPERFICIE HTTP ---

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTwinPayload {
    pub name: String,
    pub description: Option<String>,
    pub twin_type: String,
    pub properties: Value,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVersionPayload {
    pub commit_message: String,
    pub model_url: Option<String>,
    pub model_format: Option<String>,
    pub properties: Value,
}
