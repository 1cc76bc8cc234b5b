// [tests/mirror/apps/maintenance_agent/agent_loops.test.rs]
/**
 * =================================================================
 * APARATO: AGENT CONTROL LOOPS TEST (V4.0)
 * CLASIFICACIÓN: PROVING GROUNDS // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE LOS CUATRO CICLOS DEL AGENTE
 * =================================================================
 */

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};
use twinforge_domain_models::telemetry::TelemetrySample;
use twinforge_domain_models::ticket::{MaintenanceTicket, TicketDraft, TicketSeverity, TicketStatus};
use twinforge_infra_db::DbClient;
use twinforge_maintenance_agent::agent::{AgentConfig, AgentState};
use twinforge_maintenance_agent::alert::{AlertChannel, AlertFault};
use twinforge_maintenance_agent::loops::{alerts, monitor, optimizer, predictive, retrain};
use uuid::Uuid;

/// Canal de alertas de prueba: graba cada despacho.
#[derive(Default)]
struct RecordingAlertChannel {
    dispatched: Mutex<Vec<Uuid>>,
}

impl RecordingAlertChannel {
    fn dispatched_tickets(&self) -> Vec<Uuid> {
        self.dispatched.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertChannel for RecordingAlertChannel {
    async fn dispatch(&self, ticket: &MaintenanceTicket) -> Result<(), AlertFault> {
        self.dispatched.lock().unwrap().push(ticket.ticket_id);
        Ok(())
    }
}

async fn proving_state(database_url: &str) -> (AgentState, Arc<RecordingAlertChannel>) {
    let client = DbClient::connect(database_url, None, 10).await.unwrap();
    let channel = Arc::new(RecordingAlertChannel::default());
    let state = AgentState::new(client, channel.clone(), AgentConfig::default());
    (state, channel)
}

fn sample(node_id: Uuid, minutes_ago: i64, vib_x: f64, temperature: f64, tool_wear: f64) -> TelemetrySample {
    TelemetrySample {
        time: Utc::now() - Duration::minutes(minutes_ago),
        node_id,
        rpm: Some(2000.0),
        torque: Some(34.0),
        vibration_x: Some(vib_x),
        vibration_y: Some(0.0),
        vibration_z: Some(0.0),
        temperature: Some(temperature),
        power: Some(5.0),
        tool_wear: Some(tool_wear),
        error_code: None,
        custom_metrics: None,
    }
}

#[tokio::test]
async fn certify_threshold_monitoring_with_dedup() {
    println!("\n🩺 [PROVING_GROUNDS]: Auditing threshold monitor cycle...");

    let (state, _) = proving_state("file::mem_agent_monitor?mode=memory&cache=shared").await;
    let node = Uuid::new_v4();

    // 1. SETUP: nodo en línea con vibración crítica sostenida.
    state.node_repository.upsert_seen(node, Utc::now()).await.unwrap();
    let window: Vec<TelemetrySample> =
        (0..10).map(|i| sample(node, i % 4, 0.85, 60.0, 20.0)).collect();
    state.telemetry_repository.insert_batch(&window).await.unwrap();

    // 2. EXECUTION: dos ticks consecutivos del monitor.
    monitor::run_monitor_cycle(&state).await.unwrap();
    monitor::run_monitor_cycle(&state).await.unwrap();

    // 3. VALIDATION: un único incidente con el título de dedup exacto.
    let expected_title = "Critical vibration: 0.85g (limit: 0.8g)";
    assert_eq!(state.ticket_repository.count_for(node, expected_title).await.unwrap(), 1);

    let open = state.ticket_repository.open_tickets().await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].severity, TicketSeverity::Critical);

    println!("   ✅ [SUCCESS]: Threshold breach ticketed once across two ticks.");
}

#[tokio::test]
async fn certify_anomaly_detection_flow() {
    println!("\n🧠 [PROVING_GROUNDS]: Auditing train→classify→ticket flow...");

    let (state, _) = proving_state("file::mem_agent_anomaly?mode=memory&cache=shared").await;
    let node = Uuid::new_v4();
    state.node_repository.upsert_seen(node, Utc::now()).await.unwrap();

    // 1. SETUP: 150 muestras limpias con jitter determinista (30 días).
    let history: Vec<TelemetrySample> = (0..150)
        .map(|i| {
            let jitter = ((i * 37) % 100) as f64 / 1000.0;
            let mut clean = sample(node, 60 * 24 * 20 - i, 0.10 + jitter * 0.2, 58.0 + jitter * 10.0, 15.0);
            clean.rpm = Some(2000.0 + jitter * 100.0);
            clean.torque = Some(34.0 + jitter * 4.0);
            clean.power = Some(5.0 + jitter);
            clean
        })
        .collect();
    state.telemetry_repository.insert_batch(&history).await.unwrap();

    // 2. ENTRENAMIENTO: el ciclo de reentrenamiento instala el modelo.
    retrain::run_retrain_cycle(&state).await.unwrap();
    assert!(state.cached_model(node).is_some());

    // 3. OUTLIER: última muestra a ~10σ del cluster de entrenamiento.
    let outlier = sample(node, 0, 0.55, 92.0, 15.0);
    state.telemetry_repository.insert_sample(&outlier).await.unwrap();

    // 4. EXECUTION + VALIDATION: tick del monitor → incidente HIGH con score.
    monitor::run_monitor_cycle(&state).await.unwrap();

    let open = state.ticket_repository.open_tickets().await.unwrap();
    let anomaly_ticket = open
        .iter()
        .find(|ticket| ticket.title == "Anomalous telemetry pattern detected")
        .expect("incidente de anomalía");
    assert_eq!(anomaly_ticket.severity, TicketSeverity::High);

    let diagnostics = anomaly_ticket.diagnostic_data.as_ref().expect("payload diagnóstico");
    assert!(diagnostics["anomaly_score"].as_f64().unwrap() > 0.0);
    assert!(diagnostics["rpm"].is_number());
    assert!(diagnostics["temperature"].is_number());

    println!("   ✅ [SUCCESS]: Outlier classified and HIGH ticket carries the score.");
}

#[tokio::test]
async fn certify_trend_forecast_opens_critical_incident() {
    println!("\n🔮 [PROVING_GROUNDS]: Auditing predictive forecast cycle...");

    let (state, _) = proving_state("file::mem_agent_trend?mode=memory&cache=shared").await;
    let node = Uuid::new_v4();
    state.node_repository.upsert_seen(node, Utc::now()).await.unwrap();

    // Rampa de vibración 0.4 → 0.7 en 120 muestras dentro de 7 días:
    // pendiente diaria 0.06 g/día y probabilidad proyectada ≈ 0.87.
    let ramp: Vec<TelemetrySample> = (0..120)
        .map(|i| sample(node, (120 - i) * 60, 0.4 + 0.0025 * i as f64, 60.0, 10.0))
        .collect();
    state.telemetry_repository.insert_batch(&ramp).await.unwrap();

    predictive::run_predictive_cycle(&state).await.unwrap();

    let open = state.ticket_repository.open_tickets().await.unwrap();
    let forecast_ticket = open
        .iter()
        .find(|ticket| ticket.title == "Failure predicted by vibration trend")
        .expect("incidente de pronóstico");
    assert_eq!(forecast_ticket.severity, TicketSeverity::Critical);

    let diagnostics = forecast_ticket.diagnostic_data.as_ref().unwrap();
    assert!(diagnostics["failure_probability"].as_f64().unwrap() > 0.7);
    assert!(diagnostics["hours_to_failure"].as_f64().unwrap() > 0.0);

    println!("   ✅ [SUCCESS]: Rising trend produced a CRITICAL forecast ticket.");
}

#[tokio::test]
async fn certify_alert_dispatch_acknowledges_once() {
    println!("\n🚨 [PROVING_GROUNDS]: Auditing alert dispatch cycle...");

    let (state, channel) = proving_state("file::mem_agent_alerts?mode=memory&cache=shared").await;
    let node = Uuid::new_v4();

    let ticket = state
        .ticket_repository
        .create_deduplicated(TicketDraft {
            node_id: node,
            severity: TicketSeverity::Critical,
            title: "Critical vibration: 0.91g (limit: 0.8g)".into(),
            description: "threshold breach".into(),
            diagnostic_data: None,
        })
        .await
        .unwrap()
        .expect("incidente nuevo");

    // 1. Primer ciclo: despacha y vuelca a acknowledged.
    alerts::run_alert_cycle(&state).await.unwrap();
    assert_eq!(channel.dispatched_tickets(), vec![ticket.ticket_id]);

    let open = state.ticket_repository.open_tickets().await.unwrap();
    assert!(open.is_empty());

    // 2. Segundo ciclo: nada alertable, sin re-despacho.
    alerts::run_alert_cycle(&state).await.unwrap();
    assert_eq!(channel.dispatched_tickets().len(), 1);

    println!("   ✅ [SUCCESS]: Alert dispatched once, status flipped atomically.");
}

#[tokio::test]
async fn certify_optimizer_merges_recommendations() {
    println!("\n🗓️  [PROVING_GROUNDS]: Auditing schedule optimizer cycle...");

    let (state, _) = proving_state("file::mem_agent_optimizer?mode=memory&cache=shared").await;
    let node = Uuid::new_v4();
    state.node_repository.upsert_seen(node, Utc::now()).await.unwrap();

    // Desgaste de herramienta sobre el umbral: la regla superior gana.
    let window: Vec<TelemetrySample> =
        (0..6).map(|i| sample(node, i % 4, 0.2, 55.0, 85.0)).collect();
    state.telemetry_repository.insert_batch(&window).await.unwrap();

    state
        .ticket_repository
        .create_deduplicated(TicketDraft {
            node_id: node,
            severity: TicketSeverity::Medium,
            title: "High tool wear: 85% (limit: 80%)".into(),
            description: "wear threshold breach".into(),
            diagnostic_data: None,
        })
        .await
        .unwrap()
        .expect("incidente nuevo");

    optimizer::run_optimizer_cycle(&state).await.unwrap();

    let open = state.ticket_repository.open_tickets().await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].status, TicketStatus::Open);

    let diagnostics = open[0].diagnostic_data.as_ref().expect("diagnóstico enriquecido");
    assert_eq!(diagnostics["recommendation"]["action"], "Replace cutting tool");
    assert_eq!(diagnostics["recommendation"]["urgency_hours"], 168);
    assert!(diagnostics["priority_score"].as_f64().unwrap() >= 50.0);

    println!("   ✅ [SUCCESS]: Top-priority incident enriched with decision-tree action.");
}
