// [libs/domain/analytics/src/recommend.rs]
/*!
 * =================================================================
 * APARATO: TICKET POLICY ENGINE (V4.1)
 * CLASIFICACIÓN: DOMAIN INFERENCE (ESTRATO L2)
 * RESPONSABILIDAD: PRIORIZACIÓN, ÁRBOL DE RECOMENDACIÓN Y BORRADORES
 *
 * El árbol de decisión se evalúa de arriba hacia abajo y la primera regla
 * que aplica gana. Urgencia: 24 h para severidad crítica, 168 h en el resto.
 * =================================================================
 */

use crate::health::NodeHealthReport;
use crate::{TEMP_CRIT, TOOL_WEAR_CRIT, VIB_CRIT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use twinforge_domain_models::ticket::{MaintenanceTicket, TicketDraft, TicketSeverity};

/// Recomendación determinista de mantenimiento para un nodo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRecommendation {
    pub action: String,
    pub parts: Vec<String>,
    pub estimated_cost_usd: f64,
    pub estimated_downtime_hours: f64,
    /// Ventana máxima para ejecutar la acción.
    pub urgency_hours: i64,
}

/// Puntaje de prioridad: peso base de severidad + 0.5 × edad en horas.
pub fn priority_score(severity: TicketSeverity, created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_hours = (now - created_at).num_seconds().max(0) as f64 / 3600.0;
    severity.base_priority() + 0.5 * age_hours
}

/// Ordena los tickets por prioridad descendente y entrega los N primeros.
pub fn rank_tickets(
    tickets: &[MaintenanceTicket],
    now: DateTime<Utc>,
    top_n: usize,
) -> Vec<MaintenanceTicket> {
    let mut ranked: Vec<(f64, &MaintenanceTicket)> = tickets
        .iter()
        .map(|ticket| (priority_score(ticket.severity, ticket.created_at, now), ticket))
        .collect();

    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    ranked.into_iter().take(top_n).map(|(_, ticket)| ticket.clone()).collect()
}

/// Árbol de decisión de recomendación, gobernado por la salud del nodo.
pub fn recommend_action(
    health: &NodeHealthReport,
    severity: TicketSeverity,
) -> MaintenanceRecommendation {
    let urgency_hours = if severity == TicketSeverity::Critical { 24 } else { 168 };

    if health.tool_wear >= TOOL_WEAR_CRIT {
        MaintenanceRecommendation {
            action: "Replace cutting tool".to_string(),
            parts: vec!["Cutting Tool Assembly".to_string()],
            estimated_cost_usd: 450.0,
            estimated_downtime_hours: 2.0,
            urgency_hours,
        }
    } else if health.vibration >= VIB_CRIT {
        MaintenanceRecommendation {
            action: "Inspect and replace spindle bearings".to_string(),
            parts: vec!["Front Bearing Set".to_string(), "Rear Bearing Set".to_string()],
            estimated_cost_usd: 1200.0,
            estimated_downtime_hours: 8.0,
            urgency_hours,
        }
    } else if health.temperature >= TEMP_CRIT {
        MaintenanceRecommendation {
            action: "Check cooling system and replace thermal compound".to_string(),
            parts: vec!["Thermal Compound".to_string(), "Coolant".to_string()],
            estimated_cost_usd: 150.0,
            estimated_downtime_hours: 3.0,
            urgency_hours,
        }
    } else {
        MaintenanceRecommendation {
            action: "Routine inspection and lubrication".to_string(),
            parts: vec!["Lubricant".to_string(), "Filter Kit".to_string()],
            estimated_cost_usd: 80.0,
            estimated_downtime_hours: 1.5,
            urgency_hours,
        }
    }
}

/// Borradores de incidente por cruce de umbral sensorial. El título es la
/// clave de deduplicación: formato estable entre ticks del monitor.
pub fn threshold_drafts(health: &NodeHealthReport) -> Vec<TicketDraft> {
    let mut drafts = Vec::new();

    let diagnostics = json!({
        "vibration": health.vibration,
        "temperature": health.temperature,
        "tool_wear": health.tool_wear,
        "health_score": health.health_score,
        "predicted_hours_to_failure": health.predicted_hours_to_failure,
    });

    if health.vibration >= VIB_CRIT {
        drafts.push(TicketDraft {
            node_id: health.node_id,
            severity: TicketSeverity::Critical,
            title: format!("Critical vibration: {:.2}g (limit: {}g)", health.vibration, VIB_CRIT),
            description: format!(
                "Mean vibration over the assessment window reached {:.3}g; projected time to failure {:.1}h.",
                health.vibration, health.predicted_hours_to_failure
            ),
            diagnostic_data: Some(diagnostics.clone()),
        });
    }

    if health.temperature >= TEMP_CRIT {
        drafts.push(TicketDraft {
            node_id: health.node_id,
            severity: TicketSeverity::High,
            title: format!(
                "Critical temperature: {:.1}C (limit: {}C)",
                health.temperature, TEMP_CRIT
            ),
            description: format!(
                "Mean head temperature over the assessment window reached {:.1}C.",
                health.temperature
            ),
            diagnostic_data: Some(diagnostics.clone()),
        });
    }

    if health.tool_wear >= TOOL_WEAR_CRIT {
        drafts.push(TicketDraft {
            node_id: health.node_id,
            severity: TicketSeverity::Medium,
            title: format!("High tool wear: {:.0}% (limit: {}%)", health.tool_wear, TOOL_WEAR_CRIT),
            description: format!(
                "Tool wear average reached {:.1}%; replacement recommended before next cycle.",
                health.tool_wear
            ),
            diagnostic_data: Some(diagnostics),
        });
    }

    drafts
}
