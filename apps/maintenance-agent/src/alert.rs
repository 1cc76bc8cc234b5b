// [apps/maintenance-agent/src/alert.rs]
/*!
 * =================================================================
 * APARATO: OUTBOUND ALERT CHANNEL (V4.0)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: CAPACIDAD DE DESPACHO DE ALERTAS CRÍTICAS
 *
 * El transporte de correo real es colaborador externo; la capacidad se
 * programa contra este contrato y la implementación por defecto emite
 * al rastro estructurado.
 * =================================================================
 */

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;
use twinforge_domain_models::ticket::MaintenanceTicket;

#[derive(Error, Debug)]
pub enum AlertFault {
    #[error("[L4_ALERT_FAULT]: DISPATCH_REJECTED -> {0}")]
    Dispatch(String),
}

/// Canal saliente de alertas de mantenimiento.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    async fn dispatch(&self, ticket: &MaintenanceTicket) -> Result<(), AlertFault>;
}

/// Implementación por defecto: alerta estructurada en el rastro.
pub struct TracingAlertChannel;

#[async_trait]
impl AlertChannel for TracingAlertChannel {
    async fn dispatch(&self, ticket: &MaintenanceTicket) -> Result<(), AlertFault> {
        warn!(
            ticket_id = %ticket.ticket_id,
            node_id = %ticket.node_id,
            severity = ?ticket.severity,
            "🚨 [ALERT_DISPATCH]: {}",
            ticket.title
        );
        Ok(())
    }
}
