// [tests/mirror/libs/infra/db/ticket_dedup.test.rs]
/**
 * =================================================================
 * APARATO: TICKET DEDUP TEST (V4.0)
 * CLASIFICACIÓN: PROVING GROUNDS // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE LA VENTANA DE DEDUPLICACIÓN 24H
 * =================================================================
 */

use chrono::Utc;
use serde_json::json;
use twinforge_domain_models::ticket::{TicketDraft, TicketSeverity};
use twinforge_infra_db::repositories::TicketRepository;
use twinforge_infra_db::DbClient;
use uuid::Uuid;

fn vibration_draft(node_id: Uuid) -> TicketDraft {
    TicketDraft {
        node_id,
        severity: TicketSeverity::Critical,
        title: "Critical vibration: 0.85g (limit: 0.8g)".into(),
        description: "Mean vibration breached the critical threshold.".into(),
        diagnostic_data: Some(json!({"vibration": 0.85})),
    }
}

#[tokio::test]
async fn certify_duplicate_incident_suppression() {
    println!("\n🎫 [PROVING_GROUNDS]: Auditing incident dedup window...");

    // 1. SETUP
    let client = DbClient::connect("file::mem_ticket_v4?mode=memory&cache=shared", None, 10)
        .await
        .unwrap();
    let repo = TicketRepository::new(client);
    let node = Uuid::new_v4();

    // 2. EXECUTION: dos borradores idénticos dentro de la ventana.
    let first = repo.create_deduplicated(vibration_draft(node)).await.unwrap();
    let second = repo.create_deduplicated(vibration_draft(node)).await.unwrap();

    // 3. VALIDATION: el segundo se suprime, el conteo queda en 1.
    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(repo.count_for(node, "Critical vibration: 0.85g (limit: 0.8g)").await.unwrap(), 1);

    // 4. NODOS DISTINTOS: el par (node_id, title) es la clave, no el título.
    let other_node = Uuid::new_v4();
    assert!(repo.create_deduplicated(vibration_draft(other_node)).await.unwrap().is_some());

    println!("   ✅ [SUCCESS]: Dedup key (node_id, title) enforced.");
}

#[tokio::test]
async fn certify_acknowledge_flip_is_single_shot() {
    println!("\n📨 [PROVING_GROUNDS]: Auditing atomic acknowledge flip...");

    let client = DbClient::connect("file::mem_ticket_ack?mode=memory&cache=shared", None, 10)
        .await
        .unwrap();
    let repo = TicketRepository::new(client);

    let ticket = repo
        .create_deduplicated(vibration_draft(Uuid::new_v4()))
        .await
        .unwrap()
        .expect("incidente nuevo");

    let now = Utc::now();
    assert!(repo.acknowledge(ticket.ticket_id, now).await.unwrap());
    // Segundo vuelco: la guarda status='open' lo rechaza.
    assert!(!repo.acknowledge(ticket.ticket_id, now).await.unwrap());

    // Un incidente acknowledged sigue contando para la deduplicación.
    assert!(repo.create_deduplicated(vibration_draft(ticket.node_id)).await.unwrap().is_none());

    println!("   ✅ [SUCCESS]: open → acknowledged transition sealed once.");
}
