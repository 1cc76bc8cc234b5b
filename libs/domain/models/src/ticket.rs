// [libs/domain/models/src/ticket.rs]
/*!
 * =================================================================
 * APARATO: MAINTENANCE TICKET CONTRACTS (V4.0)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: INCIDENTES DE MANTENIMIENTO Y SU CICLO DE VIDA
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Severidad de un incidente. El orden define el peso base de priorización.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl TicketSeverity {
    /// Peso base del motor de priorización.
    pub fn base_priority(self) -> f64 {
        match self {
            TicketSeverity::Critical => 100.0,
            TicketSeverity::High => 75.0,
            TicketSeverity::Medium => 50.0,
            TicketSeverity::Low => 25.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    Acknowledged,
    InProgress,
    Resolved,
}

/// Incidente de mantenimiento. Clave de deduplicación: `(node_id, title)`
/// dentro de una ventana de 24 horas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceTicket {
    pub ticket_id: Uuid,
    pub node_id: Uuid,
    pub severity: TicketSeverity,
    pub title: String,
    pub description: String,
    /// Evidencia diagnóstica serializada verbatim a la columna JSON.
    pub diagnostic_data: Option<Value>,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

/// Borrador de incidente previo a la deduplicación.
#[derive(Debug, Clone)]
pub struct TicketDraft {
    pub node_id: Uuid,
    pub severity: TicketSeverity,
    pub title: String,
    pub description: String,
    pub diagnostic_data: Option<Value>,
}
