// [libs/domain/models/src/tests_serialization.rs]
/**
 * =================================================================
 * APARATO: MODELS SERIALIZATION TEST (V4.0)
 * CLASIFICACIÓN: PROVING GROUNDS // ESTRATO L2
 * RESPONSABILIDAD: CERTIFICACIÓN DE PARIDAD DE CABLE DE LOS CONTRATOS
 * =================================================================
 */

use twinforge_domain_models::frames::{ClientFrame, ServerFrame};
use twinforge_domain_models::lock::{twin_lock_key, LockHolder, LockType, TwinLockRecord};
use twinforge_domain_models::ticket::{TicketSeverity, TicketStatus};
use uuid::Uuid;

#[test]
fn client_frames_use_snake_case_discriminator() {
    let twin = Uuid::new_v4();
    let frame: ClientFrame =
        serde_json::from_str(&format!(r#"{{"type":"subscribe","twin_id":"{}"}}"#, twin)).unwrap();
    assert!(matches!(frame, ClientFrame::Subscribe { twin_id } if twin_id == twin));

    let heartbeat: ClientFrame = serde_json::from_str(r#"{"type":"heartbeat"}"#).unwrap();
    assert!(matches!(heartbeat, ClientFrame::Heartbeat));
}

#[test]
fn server_frames_carry_type_tag_on_the_wire() {
    let wire = ServerFrame::Subscribed { twin_id: Uuid::new_v4() }.to_wire();
    assert!(wire.contains(r#""type":"subscribed""#));

    let pong = ServerFrame::Pong.to_wire();
    assert_eq!(pong, r#"{"type":"pong"}"#);
}

#[test]
fn severity_and_status_serialize_to_spec_literals() {
    assert_eq!(serde_json::to_string(&TicketSeverity::Critical).unwrap(), r#""critical""#);
    assert_eq!(serde_json::to_string(&TicketStatus::InProgress).unwrap(), r#""in_progress""#);
    assert_eq!(serde_json::to_string(&LockType::Exclusive).unwrap(), r#""exclusive""#);
}

#[test]
fn twin_lock_record_survives_wire_round_trip() {
    let mut record = TwinLockRecord::default();
    record.exclusive_holders.push(LockHolder {
        lock_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        session_id: Uuid::new_v4(),
        components: ["chassis.bolt1".to_string()].into_iter().collect(),
        acquired_at: chrono::Utc::now(),
        expires_at: chrono::Utc::now() + chrono::Duration::seconds(300),
    });

    let raw = serde_json::to_string(&record).unwrap();
    let rehydrated: TwinLockRecord = serde_json::from_str(&raw).unwrap();
    assert_eq!(rehydrated.exclusive_holders.len(), 1);
    assert!(rehydrated.exclusive_holders[0].covers("chassis.bolt1.thread"));
}

#[test]
fn twin_lock_key_matches_kv_layout() {
    let twin = Uuid::nil();
    assert_eq!(twin_lock_key(twin), format!("lock:twin:{}", twin));
}
