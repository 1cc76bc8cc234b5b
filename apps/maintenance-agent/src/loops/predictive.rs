// [apps/maintenance-agent/src/loops/predictive.rs]
/*!
 * =================================================================
 * APARATO: PREDICTIVE FORECAST LOOP (V4.1)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L4)
 * RESPONSABILIDAD: PROYECCIÓN DE TENDENCIA Y ALERTA TEMPRANA CRÍTICA
 *
 * Corre cada hora: ajusta la tendencia de vibración sobre 7 días de
 * muestras (cadencia asumida horaria) y abre un incidente CRÍTICO cuando
 * la probabilidad proyectada de falla supera 0.7.
 * =================================================================
 */

use crate::agent::AgentState;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use tracing::{info, instrument};
use twinforge_domain_analytics::failure::forecast_trend;
use twinforge_domain_models::ticket::{TicketDraft, TicketSeverity};

/// Ventana de historia del pronóstico de tendencia.
const FORECAST_WINDOW_DAYS: i64 = 7;

/// Probabilidad proyectada que dispara el incidente crítico.
const CRITICAL_PROBABILITY_THRESHOLD: f64 = 0.7;

#[instrument(skip(state))]
pub async fn run_predictive_cycle(state: &AgentState) -> anyhow::Result<()> {
    let forecast_floor = Utc::now() - ChronoDuration::days(FORECAST_WINDOW_DAYS);
    let fleet = state.node_repository.online_nodes().await?;

    let mut critical_forecasts = 0usize;
    for node in &fleet {
        let history = state
            .telemetry_repository
            .window_since(node.node_id, forecast_floor, false)
            .await?;

        // Menos de 100 muestras: el pronóstico se abstiene.
        let Some(forecast) = forecast_trend(&history) else {
            continue;
        };

        if forecast.failure_probability <= CRITICAL_PROBABILITY_THRESHOLD {
            continue;
        }

        let draft = TicketDraft {
            node_id: node.node_id,
            severity: TicketSeverity::Critical,
            title: "Failure predicted by vibration trend".to_string(),
            description: format!(
                "Projected failure in {:.1}h at probability {:.2}; vibration drifting {:.4}g/day.",
                forecast.hours_to_failure, forecast.failure_probability, forecast.vib_trend_per_day
            ),
            diagnostic_data: Some(json!({
                "hours_to_failure": forecast.hours_to_failure,
                "failure_probability": forecast.failure_probability,
                "vib_trend_per_day": forecast.vib_trend_per_day,
                "temp_slope_per_sample": forecast.temp_slope_per_sample,
                "current_vibration": forecast.current_vibration,
            })),
        };

        if state.ticket_repository.create_deduplicated(draft).await?.is_some() {
            critical_forecasts += 1;
        }
    }

    if critical_forecasts > 0 {
        info!("🔮 [PREDICTIVE]: {} critical failure forecasts issued.", critical_forecasts);
    }
    Ok(())
}
