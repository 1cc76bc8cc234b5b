// [libs/domain/analytics/src/failure.rs]
/*!
 * =================================================================
 * APARATO: FAILURE PREDICTOR (V4.1)
 * CLASIFICACIÓN: DOMAIN INFERENCE (ESTRATO L2)
 * RESPONSABILIDAD: PRONÓSTICO DE CORTO PLAZO Y PROYECCIÓN DE TENDENCIA
 *
 * Dos modos. El corto plazo proyecta linealmente la vibración media de la
 * ventana contra el umbral crítico. El modo de tendencia ajusta una recta
 * por mínimos cuadrados sobre 7 días de muestras (cadencia asumida
 * horaria) y proyecta el cruce del umbral.
 * =================================================================
 */

use crate::VIB_CRIT;
use serde::{Deserialize, Serialize};
use twinforge_domain_models::telemetry::TelemetrySample;

/// Muestras mínimas para que la proyección de tendencia sea admisible.
pub const TREND_MIN_SAMPLES: usize = 100;

/// Deriva diaria mínima (g/día) para considerar que existe tendencia.
const TREND_PER_DAY_FLOOR: f64 = 0.01;

/// Horas de vida útil asumidas con vibración nula.
const FULL_HORIZON_HOURS: f64 = 720.0;

/// Pronóstico de corto plazo: horas estimadas hasta la falla dada la
/// vibración media de la ventana. Cero cuando ya se cruzó el umbral.
pub fn predict_failure_time(mean_vibration: f64) -> f64 {
    if mean_vibration >= VIB_CRIT {
        return 0.0;
    }
    (FULL_HORIZON_HOURS * (1.0 - mean_vibration / VIB_CRIT)).max(0.0)
}

/// Proyección de tendencia sobre una ventana de 7 días.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendForecast {
    /// Pendiente de vibración por muestra (mínimos cuadrados).
    pub vib_slope_per_sample: f64,
    /// Pendiente de temperatura por muestra.
    pub temp_slope_per_sample: f64,
    /// Media de las últimas 10 magnitudes de vibración.
    pub current_vibration: f64,
    /// Deriva diaria proyectada (pendiente × 24).
    pub vib_trend_per_day: f64,
    /// Horas proyectadas hasta cruzar VIB_CRIT; infinito sin tendencia.
    pub hours_to_failure: f64,
    /// Probabilidad de falla en [0, 1].
    pub failure_probability: f64,
}

/// Ajusta la tendencia sobre la ventana (ordenada ascendente por tiempo).
/// Retorna `None` con menos de `TREND_MIN_SAMPLES` muestras.
pub fn forecast_trend(window: &[TelemetrySample]) -> Option<TrendForecast> {
    if window.len() < TREND_MIN_SAMPLES {
        return None;
    }

    // Ejes ausentes imputados a cero, coherente con el vector de anomalías.
    let vibration_series: Vec<f64> = window.iter().map(imputed_vibration_magnitude).collect();
    let temperature_series: Vec<f64> = window
        .iter()
        .map(|sample| sample.temperature.unwrap_or(0.0))
        .collect();

    let vib_slope_per_sample = least_squares_slope(&vibration_series);
    let temp_slope_per_sample = least_squares_slope(&temperature_series);

    let recent_tail = &vibration_series[vibration_series.len().saturating_sub(10)..];
    let current_vibration = recent_tail.iter().sum::<f64>() / recent_tail.len() as f64;

    let vib_trend_per_day = vib_slope_per_sample * 24.0;

    let (hours_to_failure, failure_probability) = if vib_trend_per_day > TREND_PER_DAY_FLOOR {
        let hours = ((VIB_CRIT - current_vibration) / (vib_trend_per_day / 24.0)).max(0.0);
        (hours, (current_vibration / VIB_CRIT).min(1.0))
    } else {
        (f64::INFINITY, 0.1)
    };

    Some(TrendForecast {
        vib_slope_per_sample,
        temp_slope_per_sample,
        current_vibration,
        vib_trend_per_day,
        hours_to_failure,
        failure_probability,
    })
}

fn imputed_vibration_magnitude(sample: &TelemetrySample) -> f64 {
    let x = sample.vibration_x.unwrap_or(0.0);
    let y = sample.vibration_y.unwrap_or(0.0);
    let z = sample.vibration_z.unwrap_or(0.0);
    (x * x + y * y + z * z).sqrt()
}

/// Pendiente de mínimos cuadrados de la serie contra su índice de muestra.
fn least_squares_slope(series: &[f64]) -> f64 {
    let n = series.len() as f64;
    if series.len() < 2 {
        return 0.0;
    }

    let mean_x = (n - 1.0) / 2.0;
    let mean_y = series.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (index, value) in series.iter().enumerate() {
        let dx = index as f64 - mean_x;
        numerator += dx * (value - mean_y);
        denominator += dx * dx;
    }

    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
