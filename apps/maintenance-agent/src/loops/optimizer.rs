// [apps/maintenance-agent/src/loops/optimizer.rs]
/*!
 * =================================================================
 * APARATO: SCHEDULE OPTIMIZER LOOP (V4.1)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: PRIORIZACIÓN DE INCIDENTES Y RECOMENDACIONES
 *
 * Corre cada hora: ordena los incidentes abiertos por prioridad
 * (severidad + edad), toma los N primeros y fusiona la recomendación
 * determinista del árbol de decisión dentro del diagnóstico del ticket.
 * =================================================================
 */

use crate::agent::AgentState;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use tracing::{info, instrument};
use twinforge_domain_analytics::health::assess_node_health;
use twinforge_domain_analytics::recommend::{priority_score, rank_tickets, recommend_action};

/// Ventana de salud usada para contextualizar la recomendación.
const HEALTH_WINDOW_MINUTES: i64 = 5;
const HEALTH_ROW_CEILING: i64 = 100;

#[instrument(skip(state))]
pub async fn run_optimizer_cycle(state: &AgentState) -> anyhow::Result<()> {
    let now = Utc::now();
    let open_tickets = state.ticket_repository.open_tickets().await?;
    if open_tickets.is_empty() {
        return Ok(());
    }

    let prioritized = rank_tickets(&open_tickets, now, state.config.optimizer_top_n);

    let mut enriched = 0usize;
    for ticket in &prioritized {
        let node = state.node_repository.fetch(ticket.node_id).await?;
        let window = state
            .telemetry_repository
            .recent_window(ticket.node_id, ChronoDuration::minutes(HEALTH_WINDOW_MINUTES), HEALTH_ROW_CEILING)
            .await?;

        let health = assess_node_health(
            ticket.node_id,
            &window,
            node.and_then(|node| node.last_maintenance_at),
            now,
        );

        let recommendation = recommend_action(&health, ticket.severity);

        // La recomendación se fusiona sobre el diagnóstico existente.
        let mut diagnostics = ticket.diagnostic_data.clone().unwrap_or_else(|| json!({}));
        if let Some(diagnostic_map) = diagnostics.as_object_mut() {
            diagnostic_map.insert("recommendation".into(), serde_json::to_value(&recommendation)?);
            diagnostic_map.insert(
                "priority_score".into(),
                json!(priority_score(ticket.severity, ticket.created_at, now)),
            );
        }

        if state.ticket_repository.merge_diagnostics(ticket.ticket_id, &diagnostics).await? {
            enriched += 1;
        }
    }

    info!("🗓️  [OPTIMIZER]: {} of {} open incidents enriched with recommendations.", enriched, open_tickets.len());
    Ok(())
}
