// [libs/domain/analytics/src/health.rs]
/*!
 * =================================================================
 * APARATO: NODE HEALTH ASSESSOR (V4.1)
 * CLASIFICACIÓN: DOMAIN INFERENCE (ESTRATO L2)
 * RESPONSABILIDAD: AGREGACIÓN DE VENTANA Y PUNTUACIÓN COMPUESTA
 *
 * # Mathematical Proof (Composite Score):
 *   vib_score   = max(0, 100 − (vibration / VIB_CRIT)  × 100)
 *   temp_score  = max(0, 100 − (temp      / TEMP_CRIT) × 100)
 *   wear_score  = max(0, 100 − tool_wear)
 *   maint_score = 100 × exp(−days / 180)
 *   health      = 0.30·vib + 0.25·temp + 0.25·wear + 0.20·maint ∈ [0, 100]
 * =================================================================
 */

use crate::{failure, DAYS_SINCE_MAINTENANCE_UNKNOWN, TEMP_CRIT, VIB_CRIT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use twinforge_domain_models::telemetry::TelemetrySample;
use uuid::Uuid;

/// Veredicto de salud de un nodo con todas las métricas intermedias.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeHealthReport {
    pub node_id: Uuid,
    pub sample_count: usize,
    /// Media de la magnitud de vibración √(x²+y²+z²) en la ventana (g).
    pub vibration: f64,
    pub temperature: f64,
    pub rpm: f64,
    pub tool_wear: f64,
    pub days_since_maintenance: i64,
    pub vib_score: f64,
    pub temp_score: f64,
    pub wear_score: f64,
    pub maint_score: f64,
    /// Compuesto 0–100, mayor es más sano.
    pub health_score: f64,
    /// Pronóstico de corto plazo derivado de la misma ventana (horas).
    pub predicted_hours_to_failure: f64,
    pub assessed_at: DateTime<Utc>,
}

/// Agrega la ventana de telemetría de un nodo y calcula el compuesto.
///
/// La vibración promedia solo muestras con los tres ejes presentes; el
/// resto de sensores promedia sus muestras no nulas. Sin fecha de último
/// mantenimiento se asume el centinela de 9999 días.
pub fn assess_node_health(
    node_id: Uuid,
    window: &[TelemetrySample],
    last_maintenance_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> NodeHealthReport {
    let vibration = mean(window.iter().filter_map(TelemetrySample::vibration_magnitude));
    let temperature = mean(window.iter().filter_map(|sample| sample.temperature));
    let rpm = mean(window.iter().filter_map(|sample| sample.rpm));
    let tool_wear = mean(window.iter().filter_map(|sample| sample.tool_wear));

    let days_since_maintenance = last_maintenance_at
        .map(|stamp| (now - stamp).num_days().max(0))
        .unwrap_or(DAYS_SINCE_MAINTENANCE_UNKNOWN);

    let vib_score = (100.0 - (vibration / VIB_CRIT) * 100.0).max(0.0);
    let temp_score = (100.0 - (temperature / TEMP_CRIT) * 100.0).max(0.0);
    let wear_score = (100.0 - tool_wear).max(0.0);
    let maint_score = 100.0 * (-(days_since_maintenance as f64) / 180.0).exp();

    let health_score = (0.30 * vib_score + 0.25 * temp_score + 0.25 * wear_score + 0.20 * maint_score)
        .clamp(0.0, 100.0);

    NodeHealthReport {
        node_id,
        sample_count: window.len(),
        vibration,
        temperature,
        rpm,
        tool_wear,
        days_since_maintenance,
        vib_score,
        temp_score,
        wear_score,
        maint_score,
        health_score,
        predicted_hours_to_failure: failure::predict_failure_time(vibration),
        assessed_at: now,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
