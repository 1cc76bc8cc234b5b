// [tests/mirror/libs/infra/db/telemetry_ingest.test.rs]
/**
 * =================================================================
 * APARATO: TELEMETRY INGEST TEST (V4.0)
 * CLASIFICACIÓN: PROVING GROUNDS // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE RÁFAGAS BATCH Y VENTANAS DE CONSULTA
 * =================================================================
 */

use chrono::{Duration, Utc};
use serde_json::json;
use twinforge_domain_models::telemetry::TelemetrySample;
use twinforge_infra_db::repositories::{NodeRepository, TelemetryRepository};
use twinforge_infra_db::DbClient;
use uuid::Uuid;

fn sample(node_id: Uuid, minutes_ago: i64, error_code: Option<i64>) -> TelemetrySample {
    TelemetrySample {
        time: Utc::now() - Duration::minutes(minutes_ago),
        node_id,
        rpm: Some(2000.0),
        torque: Some(34.0),
        vibration_x: Some(0.1),
        vibration_y: Some(0.1),
        vibration_z: Some(0.1),
        temperature: Some(58.0),
        power: Some(5.2),
        tool_wear: Some(12.0),
        error_code,
        custom_metrics: Some(json!({"coolant_flow": 3.2})),
    }
}

#[tokio::test]
async fn certify_batch_burst_and_windows() {
    println!("\n📥 [PROVING_GROUNDS]: Auditing telemetry burst ingestion...");

    // 1. SETUP
    let client = DbClient::connect("file::mem_telemetry_v4?mode=memory&cache=shared", None, 10)
        .await
        .unwrap();
    let repo = TelemetryRepository::new(client.clone());
    let node = Uuid::new_v4();

    // 2. EXECUTION: ráfaga de 50 muestras, 10 de ellas sucias y 5 fuera de ventana.
    let mut burst: Vec<TelemetrySample> = (0..35).map(|i| sample(node, i % 5, None)).collect();
    burst.extend((0..10).map(|i| sample(node, i % 5, Some(7))));
    burst.extend((0..5).map(|i| sample(node, 60 * 24 * 40 + i, None)));

    let ingested = repo.insert_batch(&burst).await.expect("Fallo en ráfaga");
    assert_eq!(ingested, 50);

    // 3. VALIDATION: ventana de evaluación de 5 minutos acotada a 100 filas.
    let recent = repo
        .recent_window(node, Duration::minutes(5), 100)
        .await
        .expect("Ventana rechazada");
    assert_eq!(recent.len(), 45);

    // 4. VALIDATION: serie limpia de 30 días para entrenamiento.
    let clean = repo
        .window_since(node, Utc::now() - Duration::days(30), true)
        .await
        .unwrap();
    assert_eq!(clean.len(), 35);
    assert!(clean.windows(2).all(|pair| pair[0].time <= pair[1].time));

    // 5. VALIDATION: última muestra conocida.
    let latest = repo.latest_sample(node).await.unwrap().expect("muestra viva");
    assert!(latest.custom_metrics.is_some());

    println!("   ✅ [SUCCESS]: Burst of {} samples windowed correctly.", ingested);
}

#[tokio::test]
async fn certify_node_registry_upsert_from_ingest() {
    println!("\n🛰️  [PROVING_GROUNDS]: Auditing fleet registry upsert...");

    let client = DbClient::connect("file::mem_nodes_v4?mode=memory&cache=shared", None, 10)
        .await
        .unwrap();
    let nodes = NodeRepository::new(client);
    let node = Uuid::new_v4();

    let now = Utc::now();
    nodes.upsert_seen(node, now).await.unwrap();
    nodes.upsert_seen(node, now + Duration::seconds(30)).await.unwrap();

    let online = nodes.online_nodes().await.unwrap();
    assert_eq!(online.len(), 1);
    assert!(online[0].is_online);

    // Nodo silencioso: cae fuera de línea al superar el umbral.
    nodes.mark_offline_before(now + Duration::minutes(10)).await.unwrap();
    assert!(nodes.online_nodes().await.unwrap().is_empty());
    assert!(!nodes.fetch(node).await.unwrap().unwrap().is_online);

    println!("   ✅ [SUCCESS]: Registry reflects sightings and silence.");
}
