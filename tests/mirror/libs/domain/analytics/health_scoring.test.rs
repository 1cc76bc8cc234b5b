// [tests/mirror/libs/domain/analytics/health_scoring.test.rs]
/**
 * =================================================================
 * APARATO: HEALTH SCORING TEST (V4.0)
 * CLASIFICACIÓN: PROVING GROUNDS // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DEL COMPUESTO DE SALUD Y PRONÓSTICO
 * =================================================================
 */

use chrono::Utc;
use twinforge_domain_analytics::failure::{forecast_trend, predict_failure_time};
use twinforge_domain_analytics::health::assess_node_health;
use twinforge_domain_analytics::VIB_CRIT;
use twinforge_domain_models::telemetry::TelemetrySample;
use uuid::Uuid;

fn sample(vib_axis: f64, temperature: f64, rpm: f64, tool_wear: f64) -> TelemetrySample {
    TelemetrySample {
        time: Utc::now(),
        node_id: Uuid::new_v4(),
        rpm: Some(rpm),
        torque: Some(12.0),
        vibration_x: Some(vib_axis),
        vibration_y: Some(0.0),
        vibration_z: Some(0.0),
        temperature: Some(temperature),
        power: Some(7.5),
        tool_wear: Some(tool_wear),
        error_code: None,
        custom_metrics: None,
    }
}

#[test]
fn certify_reference_health_scenario() {
    println!("\n🩺 [PROVING_GROUNDS]: Auditing composite health strata...");

    // 1. SETUP: ventana nominal del escenario de referencia.
    let now = Utc::now();
    let window = vec![sample(0.4, 60.0, 2000.0, 30.0)];

    // 2. EXECUTION: puntuación compuesta con 30 días desde mantenimiento.
    let report = assess_node_health(
        Uuid::new_v4(),
        &window,
        Some(now - chrono::Duration::days(30)),
        now,
    );

    // 3. VALIDATION: paridad de cada sub-score y del compuesto.
    assert!((report.vib_score - 50.0).abs() < 1e-9);
    assert!((report.temp_score - 36.842).abs() < 1e-2);
    assert!((report.wear_score - 70.0).abs() < 1e-9);
    assert!((report.maint_score - 84.648).abs() < 1e-2);
    assert!((report.health_score - 58.64).abs() < 0.1);

    println!("   ✅ [SUCCESS]: Composite health strata levelized at {:.2}.", report.health_score);
}

#[test]
fn certify_failure_horizon_at_critical_vibration() {
    println!("\n⏱️  [PROVING_GROUNDS]: Auditing short-term failure horizon...");

    assert_eq!(predict_failure_time(VIB_CRIT), 0.0);
    assert!((predict_failure_time(0.2) - 540.0).abs() < 1e-9);

    println!("   ✅ [SUCCESS]: Horizon collapses to zero exactly at VIB_CRIT.");
}

#[test]
fn certify_trend_predictor_window_floor() {
    println!("\n📉 [PROVING_GROUNDS]: Auditing trend predictor admission floor...");

    // Menos de 100 muestras: la proyección debe abstenerse.
    let thin_window: Vec<TelemetrySample> =
        (0..99).map(|_| sample(0.2, 55.0, 1800.0, 20.0)).collect();
    assert!(forecast_trend(&thin_window).is_none());

    println!("   ✅ [SUCCESS]: Sub-minimum window rejected without verdict.");
}
