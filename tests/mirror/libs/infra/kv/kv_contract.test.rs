// [tests/mirror/libs/infra/kv/kv_contract.test.rs]
/**
 * =================================================================
 * APARATO: KV CONTRACT TEST (V4.0)
 * CLASIFICACIÓN: PROVING GROUNDS // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DEL CONTRATO CAS+TTL+PUBSUB
 * =================================================================
 */

use std::time::Duration;
use twinforge_infra_kv::{connect_kv, KvStratum, MemoryKv};

const LONG_TTL: Duration = Duration::from_secs(30);

#[tokio::test]
async fn certify_compare_and_set_discipline() {
    println!("\n🔐 [PROVING_GROUNDS]: Auditing CAS discipline...");

    let kv = MemoryKv::new();

    // 1. CREACIÓN: solo si el key está ausente.
    assert!(kv.install("lock:twin:alpha", None, "v1", LONG_TTL).await.unwrap());
    assert!(!kv.install("lock:twin:alpha", None, "v1-bis", LONG_TTL).await.unwrap());

    // 2. REEMPLAZO: exige el testigo vigente.
    let witnessed = kv.fetch("lock:twin:alpha").await.unwrap().expect("key vivo");
    assert_eq!(witnessed, "v1");
    assert!(!kv.install("lock:twin:alpha", Some("stale"), "v2", LONG_TTL).await.unwrap());
    assert!(kv.install("lock:twin:alpha", Some(&witnessed), "v2", LONG_TTL).await.unwrap());
    assert_eq!(kv.fetch("lock:twin:alpha").await.unwrap().as_deref(), Some("v2"));

    println!("   ✅ [SUCCESS]: Stale witness rejected, fresh witness installed.");
}

#[tokio::test]
async fn certify_ttl_expiry_and_extension() {
    println!("\n⏳ [PROVING_GROUNDS]: Auditing lease expiry...");

    let kv = MemoryKv::new();
    kv.install("lease", None, "payload", Duration::from_millis(40)).await.unwrap();

    // 1. EXTENSIÓN dentro de la ventana: el arrendamiento sobrevive.
    assert!(kv.extend_ttl("lease", Duration::from_millis(120)).await.unwrap());
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(kv.fetch("lease").await.unwrap().is_some());

    // 2. LAPSO: el key desaparece y la extensión posterior falla.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(kv.fetch("lease").await.unwrap().is_none());
    assert!(!kv.extend_ttl("lease", LONG_TTL).await.unwrap());

    println!("   ✅ [SUCCESS]: Lease extended then lapsed as specified.");
}

#[tokio::test]
async fn certify_pubsub_delivery() {
    println!("\n📡 [PROVING_GROUNDS]: Auditing pub/sub channel delivery...");

    let kv = MemoryKv::new();
    let mut subscription = kv.subscribe("twin:events:alpha").await.unwrap();

    kv.publish("twin:events:alpha", "edit-envelope").await.unwrap();
    kv.publish("twin:events:other", "foreign-envelope").await.unwrap();

    let delivered = tokio::time::timeout(Duration::from_secs(1), subscription.recv())
        .await
        .expect("entrega dentro de la ventana")
        .expect("canal vivo");
    assert_eq!(delivered, "edit-envelope");

    println!("   ✅ [SUCCESS]: Channel isolation and delivery certified.");
}

#[tokio::test]
async fn certify_memory_scheme_dispatch() {
    println!("\n🧭 [PROVING_GROUNDS]: Auditing backend dispatch by URL scheme...");

    let kv = connect_kv("memory://proving-grounds").await.unwrap();
    assert!(kv.probe().await);
    kv.install("probe", None, "1", LONG_TTL).await.unwrap();
    assert_eq!(kv.fetch("probe").await.unwrap().as_deref(), Some("1"));

    println!("   ✅ [SUCCESS]: memory:// scheme routed to in-process stratum.");
}
