// [libs/infra/db/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY REGISTRY (V4.0)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: SUPERFICIE TIPADA DE CONSULTAS Y UTILERÍA DE MAPEO
 * =================================================================
 */

pub mod edit;
pub mod identity;
pub mod lock;
pub mod node;
pub mod telemetry;
pub mod ticket;
pub mod twin;

pub use edit::EditRepository;
pub use identity::IdentityRepository;
pub use lock::LockRepository;
pub use node::NodeRepository;
pub use telemetry::TelemetryRepository;
pub use ticket::TicketRepository;
pub use twin::TwinRepository;

use crate::errors::DbError;
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// Formato canónico de marca temporal: RFC3339 UTC "+00:00" con
/// microsegundos fijos. El orden lexicográfico coincide con el cronológico.
pub(crate) fn to_stamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, false)
}

pub(crate) fn parse_stamp(raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|fault| DbError::MappingError(format!("TIMESTAMP_DRIFT [{}]: {}", raw, fault)))
}

pub(crate) fn parse_opt_stamp(raw: Option<String>) -> Result<Option<DateTime<Utc>>, DbError> {
    raw.map(|value| parse_stamp(&value)).transpose()
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw)
        .map_err(|fault| DbError::MappingError(format!("UUID_DRIFT [{}]: {}", raw, fault)))
}

/// Columna TEXT anulable: la ausencia viaja como NULL explícito.
pub(crate) fn optional_text(value: Option<String>) -> libsql::Value {
    match value {
        Some(text) => libsql::Value::from(text),
        None => libsql::Value::Null,
    }
}
