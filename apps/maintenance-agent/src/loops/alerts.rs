// [apps/maintenance-agent/src/loops/alerts.rs]
/*!
 * =================================================================
 * APARATO: ALERT DISPATCHER LOOP (V4.1)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: DESPACHO DE INCIDENTES CRÍTICOS Y VUELCO DE ESTADO
 *
 * Corre cada 5 minutos: selecciona los incidentes abiertos de severidad
 * crítica/alta creados en la última hora, los despacha por el canal
 * saliente y vuelca atómicamente open → acknowledged con su marca.
 * =================================================================
 */

use crate::agent::AgentState;
use chrono::Utc;
use tracing::{info, instrument, warn};

#[instrument(skip(state))]
pub async fn run_alert_cycle(state: &AgentState) -> anyhow::Result<()> {
    let now = Utc::now();
    let alertable = state.ticket_repository.alertable_tickets(now).await?;
    if alertable.is_empty() {
        return Ok(());
    }

    let mut dispatched = 0usize;
    for ticket in &alertable {
        if let Err(dispatch_fault) = state.alert_channel.dispatch(ticket).await {
            warn!("⚠️ [ALERT_LOOP]: Dispatch failed for {}: {}", ticket.ticket_id, dispatch_fault);
            continue;
        }

        // El vuelco con guarda status='open' asegura un único despacho.
        if state.ticket_repository.acknowledge(ticket.ticket_id, now).await? {
            dispatched += 1;
        }
    }

    info!("🚨 [ALERT_LOOP]: {} alerts dispatched and acknowledged.", dispatched);
    Ok(())
}
