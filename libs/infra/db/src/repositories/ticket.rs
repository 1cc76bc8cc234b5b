// [libs/infra/db/src/repositories/ticket.rs]
/*!
 * =================================================================
 * APARATO: MAINTENANCE TICKET REPOSITORY (V4.1)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: DEDUPLICACIÓN 24H, CICLO DE ESTADO Y DESPACHO
 *
 * # Mathematical Proof (Incident Uniqueness):
 * Antes de insertar, se busca cualquier fila open/acknowledged con el
 * mismo par (node_id, title) creada en las últimas 24 horas; si existe,
 * el borrador se suprime en silencio. Invariante resultante: a lo sumo
 * un incidente vivo por par y ventana.
 * =================================================================
 */

use super::{optional_text, parse_opt_stamp, parse_stamp, parse_uuid, to_stamp};
use crate::client::DbClient;
use crate::errors::DbError;
use chrono::{DateTime, Duration, Utc};
use libsql::params;
use tracing::{debug, info, instrument};
use twinforge_domain_models::ticket::{MaintenanceTicket, TicketDraft, TicketSeverity, TicketStatus};
use uuid::Uuid;

/// Ventana de deduplicación de incidentes.
const DEDUP_WINDOW_HOURS: i64 = 24;

pub struct TicketRepository {
    database_client: DbClient,
}

impl TicketRepository {
    pub fn new(client: DbClient) -> Self {
        Self { database_client: client }
    }

    /// Inserta el borrador salvo que un incidente vivo con el mismo
    /// `(node_id, title)` exista dentro de la ventana. `None` = suprimido.
    #[instrument(skip(self, draft), fields(node = %draft.node_id))]
    pub async fn create_deduplicated(
        &self,
        draft: TicketDraft,
    ) -> Result<Option<MaintenanceTicket>, DbError> {
        let connection = self.database_client.acquire().await?;
        let now = Utc::now();
        let dedup_floor = to_stamp(now - Duration::hours(DEDUP_WINDOW_HOURS));

        let mut duplicates = connection
            .query(
                "SELECT COUNT(*) FROM maintenance_tickets
                 WHERE node_id = ?1 AND title = ?2
                   AND status IN ('open', 'acknowledged')
                   AND created_at >= ?3",
                params![draft.node_id.to_string(), draft.title.clone(), dedup_floor],
            )
            .await?;

        if let Some(row) = duplicates.next().await? {
            if row.get::<i64>(0)? > 0 {
                debug!("🔁 [TICKET_REPO]: Duplicate incident suppressed for node {}.", draft.node_id);
                return Ok(None);
            }
        }

        let ticket = MaintenanceTicket {
            ticket_id: Uuid::new_v4(),
            node_id: draft.node_id,
            severity: draft.severity,
            title: draft.title,
            description: draft.description,
            diagnostic_data: draft.diagnostic_data,
            status: TicketStatus::Open,
            created_at: now,
            acknowledged_at: None,
        };

        let diagnostic_json = ticket
            .diagnostic_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;

        connection
            .execute(
                "INSERT INTO maintenance_tickets (ticket_id, node_id, severity, title,
                    description, diagnostic_data, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'open', ?7)",
                params![
                    ticket.ticket_id.to_string(),
                    ticket.node_id.to_string(),
                    severity_literal(ticket.severity),
                    ticket.title.clone(),
                    ticket.description.clone(),
                    optional_text(diagnostic_json),
                    to_stamp(ticket.created_at)
                ],
            )
            .await?;

        info!("🎫 [TICKET_REPO]: Incident {} opened for node {}.", ticket.ticket_id, ticket.node_id);
        Ok(Some(ticket))
    }

    /// Incidentes abiertos (sustrato del optimizador de agenda).
    #[instrument(skip(self))]
    pub async fn open_tickets(&self) -> Result<Vec<MaintenanceTicket>, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT ticket_id, node_id, severity, title, description, diagnostic_data,
                        status, created_at, acknowledged_at
                 FROM maintenance_tickets WHERE status = 'open'",
                (),
            )
            .await?;
        Self::collect_tickets(&mut rows).await
    }

    /// Incidentes alertables: abiertos, severidad crítica/alta, creados en
    /// la última hora.
    #[instrument(skip(self))]
    pub async fn alertable_tickets(&self, now: DateTime<Utc>) -> Result<Vec<MaintenanceTicket>, DbError> {
        let connection = self.database_client.acquire().await?;
        let recency_floor = to_stamp(now - Duration::hours(1));

        let mut rows = connection
            .query(
                "SELECT ticket_id, node_id, severity, title, description, diagnostic_data,
                        status, created_at, acknowledged_at
                 FROM maintenance_tickets
                 WHERE status = 'open' AND severity IN ('critical', 'high')
                   AND created_at >= ?1",
                params![recency_floor],
            )
            .await?;
        Self::collect_tickets(&mut rows).await
    }

    /// Vuelco atómico open → acknowledged con sellado de marca temporal.
    pub async fn acknowledge(&self, ticket_id: Uuid, now: DateTime<Utc>) -> Result<bool, DbError> {
        let connection = self.database_client.acquire().await?;
        let flipped = connection
            .execute(
                "UPDATE maintenance_tickets
                 SET status = 'acknowledged', acknowledged_at = ?1
                 WHERE ticket_id = ?2 AND status = 'open'",
                params![to_stamp(now), ticket_id.to_string()],
            )
            .await?;
        Ok(flipped > 0)
    }

    /// Fusiona la recomendación del optimizador dentro del diagnóstico.
    pub async fn merge_diagnostics(
        &self,
        ticket_id: Uuid,
        diagnostic_data: &serde_json::Value,
    ) -> Result<bool, DbError> {
        let connection = self.database_client.acquire().await?;
        let serialized = serde_json::to_string(diagnostic_data)
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;

        let updated = connection
            .execute(
                "UPDATE maintenance_tickets SET diagnostic_data = ?1 WHERE ticket_id = ?2",
                params![serialized, ticket_id.to_string()],
            )
            .await?;
        Ok(updated > 0)
    }

    /// Conteo por par de deduplicación (auditoría del invariante).
    pub async fn count_for(&self, node_id: Uuid, title: &str) -> Result<i64, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT COUNT(*) FROM maintenance_tickets WHERE node_id = ?1 AND title = ?2",
                params![node_id.to_string(), title],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    async fn collect_tickets(rows: &mut libsql::Rows) -> Result<Vec<MaintenanceTicket>, DbError> {
        let mut tickets = Vec::new();
        while let Some(row) = rows.next().await? {
            tickets.push(Self::map_ticket_row(&row)?);
        }
        Ok(tickets)
    }

    fn map_ticket_row(row: &libsql::Row) -> Result<MaintenanceTicket, DbError> {
        let severity_raw: String = row.get(2)?;
        let status_raw: String = row.get(6)?;
        let diagnostic_data = row
            .get::<Option<String>>(5)?
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;

        Ok(MaintenanceTicket {
            ticket_id: parse_uuid(&row.get::<String>(0)?)?,
            node_id: parse_uuid(&row.get::<String>(1)?)?,
            severity: serde_json::from_str(&format!("\"{}\"", severity_raw))
                .map_err(|fault| DbError::MappingError(format!("SEVERITY_DRIFT: {}", fault)))?,
            title: row.get(3)?,
            description: row.get(4)?,
            diagnostic_data,
            status: serde_json::from_str(&format!("\"{}\"", status_raw))
                .map_err(|fault| DbError::MappingError(format!("STATUS_DRIFT: {}", fault)))?,
            created_at: parse_stamp(&row.get::<String>(7)?)?,
            acknowledged_at: parse_opt_stamp(row.get::<Option<String>>(8)?)?,
        })
    }
}

fn severity_literal(severity: TicketSeverity) -> &'static str {
    match severity {
        TicketSeverity::Critical => "critical",
        TicketSeverity::High => "high",
        TicketSeverity::Medium => "medium",
        TicketSeverity::Low => "low",
    }
}
