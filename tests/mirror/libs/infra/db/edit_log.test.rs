// [tests/mirror/libs/infra/db/edit_log.test.rs]
/**
 * =================================================================
 * APARATO: EDIT LOG TEST (V4.0)
 * CLASIFICACIÓN: PROVING GROUNDS // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DEL ORDEN TOTAL Y LA MARCA DE AGUA
 * =================================================================
 */

use chrono::Utc;
use serde_json::json;
use twinforge_domain_models::edit::VectorClock;
use twinforge_infra_db::repositories::edit::{EditDraft, EditRepository};
use twinforge_infra_db::DbClient;
use uuid::Uuid;

fn draft(twin_id: Uuid, user_id: Uuid, clock: VectorClock, path: &str) -> EditDraft {
    EditDraft {
        twin_id,
        user_id,
        op_type: "set_property".into(),
        component_path: path.into(),
        data: json!({"value": 42}),
        vector_clock: clock,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn certify_insert_sequence_total_order() {
    println!("\n📝 [PROVING_GROUNDS]: Auditing append-only edit log...");

    // 1. SETUP
    let client = DbClient::connect("file::mem_edits_v4?mode=memory&cache=shared", None, 10)
        .await
        .unwrap();
    let repo = EditRepository::new(client);
    let twin = Uuid::new_v4();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    // 2. EXECUTION: cadena causal alice → bob, marca de agua fusionada.
    let mut alice_clock = VectorClock::default();
    alice_clock.increment(alice);
    let first = repo.append_operation(draft(twin, alice, alice_clock, "chassis.bolt1")).await.unwrap();

    let mut bob_clock = repo.high_watermark(twin).await.unwrap();
    bob_clock.increment(bob);
    let second = repo.append_operation(draft(twin, bob, bob_clock, "wheel.axle")).await.unwrap();

    // 3. VALIDATION: secuencia estrictamente creciente y extensión lineal
    // del orden parcial de relojes.
    assert!(second.op_seq > first.op_seq);
    assert!(first.vector_clock.happened_before_or_equal(&second.vector_clock));

    let replay = repo.list_operations(twin, 100).await.unwrap();
    assert_eq!(replay.len(), 2);
    assert_eq!(replay[0].op_id, first.op_id);
    assert_eq!(replay[1].op_id, second.op_id);

    // 4. MARCA DE AGUA: el reloj de la última operación domina el historial.
    let watermark = repo.high_watermark(twin).await.unwrap();
    assert_eq!(watermark, second.vector_clock);

    println!("   ✅ [SUCCESS]: Total order is a linear extension of causality.");
}

#[tokio::test]
async fn certify_empty_twin_has_default_watermark() {
    let client = DbClient::connect("file::mem_edits_empty?mode=memory&cache=shared", None, 10)
        .await
        .unwrap();
    let repo = EditRepository::new(client);

    let watermark = repo.high_watermark(Uuid::new_v4()).await.unwrap();
    assert!(watermark.0.is_empty());
}
