// [tests/mirror/apps/orchestrator/lock_manager.test.rs]
/**
 * =================================================================
 * APARATO: LOCK MANAGER TEST (V4.0)
 * CLASIFICACIÓN: PROVING GROUNDS // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE CONTENCIÓN, EXPIRACIÓN Y COSECHA
 * =================================================================
 */

use std::collections::BTreeSet;
use std::sync::Arc;
use twinforge_domain_models::lock::{twin_lock_key, LockType};
use twinforge_infra_db::repositories::LockRepository;
use twinforge_infra_db::DbClient;
use twinforge_infra_kv::{connect_kv, KvStratum};
use twinforge_orchestrator::config::OrchestratorConfig;
use twinforge_orchestrator::services::{spawn_lock_reaper, LockFault, LockManager};
use twinforge_orchestrator::state::AppState;
use uuid::Uuid;

fn components(paths: &[&str]) -> BTreeSet<String> {
    paths.iter().map(|path| path.to_string()).collect()
}

fn proving_config(database_url: &str) -> OrchestratorConfig {
    OrchestratorConfig {
        database_connection_url: database_url.to_string(),
        database_access_token: None,
        kv_connection_url: "memory://proving".to_string(),
        listening_network_port: 0,
        db_max_connections: 10,
        lock_ttl_seconds: 300,
        lock_heartbeat_grace_seconds: 1,
        lock_reaper_interval_seconds: 1,
        lock_cas_retry_limit: 5,
        ws_heartbeat_interval_seconds: 15,
        session_ttl_seconds: 3600,
        telemetry_open_ingest: false,
    }
}

async fn proving_manager(database_url: &str) -> (Arc<dyn KvStratum>, LockManager) {
    let client = DbClient::connect(database_url, None, 10).await.unwrap();
    let kv = connect_kv("memory://proving").await.unwrap();
    let repo = Arc::new(LockRepository::new(client));
    (kv.clone(), LockManager::new(kv, repo, 300, 5))
}

#[tokio::test]
async fn certify_exclusive_contention_scenario() {
    println!("\n🔒 [PROVING_GROUNDS]: Auditing exclusive lock contention...");

    let (_kv, manager) = proving_manager("file::mem_lock_cont?mode=memory&cache=shared").await;
    let twin = Uuid::new_v4();
    let (user_a, session_a) = (Uuid::new_v4(), Uuid::new_v4());
    let (user_b, session_b) = (Uuid::new_v4(), Uuid::new_v4());

    // 1. A adquiere exclusivo sobre chassis.bolt1.
    let lock_a = manager
        .acquire(twin, user_a, session_a, components(&["chassis.bolt1"]), LockType::Exclusive, 300)
        .await
        .expect("A debe adquirir");

    // 2. B choca sobre el mismo componente; el portador viaja en el fallo.
    let clash = manager
        .acquire(twin, user_b, session_b, components(&["chassis.bolt1"]), LockType::Exclusive, 300)
        .await;
    match clash {
        Err(LockFault::Conflict { holder_user_id }) => assert_eq!(holder_user_id, Some(user_a)),
        other => panic!("Se esperaba Conflict, llegó {:?}", other.map(|_| ())),
    }

    // 3. B sí adquiere sobre un componente disjunto.
    manager
        .acquire(twin, user_b, session_b, components(&["wheel.axle"]), LockType::Exclusive, 300)
        .await
        .expect("B debe adquirir el componente disjunto");

    // 4. Release de A → re-adquisición inmediata del mismo componente.
    manager.release(lock_a).await.expect("release limpio");
    manager
        .acquire(twin, user_a, session_a, components(&["chassis.bolt1"]), LockType::Exclusive, 300)
        .await
        .expect("A debe re-adquirir tras el release");

    println!("   ✅ [SUCCESS]: Contention rules and release cycle certified.");
}

#[tokio::test]
async fn certify_shared_reader_compatibility() {
    println!("\n📖 [PROVING_GROUNDS]: Auditing shared lock compatibility...");

    let (_kv, manager) = proving_manager("file::mem_lock_shared?mode=memory&cache=shared").await;
    let twin = Uuid::new_v4();

    // Dos lectores conviven sobre el mismo componente.
    manager
        .acquire(twin, Uuid::new_v4(), Uuid::new_v4(), components(&["spindle"]), LockType::Shared, 300)
        .await
        .expect("primer lector");
    manager
        .acquire(twin, Uuid::new_v4(), Uuid::new_v4(), components(&["spindle"]), LockType::Shared, 300)
        .await
        .expect("segundo lector");

    // Un escritor sobre el solapamiento es rechazado.
    let writer = manager
        .acquire(twin, Uuid::new_v4(), Uuid::new_v4(), components(&["spindle.motor"]), LockType::Exclusive, 300)
        .await;
    assert!(matches!(writer, Err(LockFault::Conflict { .. })));

    println!("   ✅ [SUCCESS]: Reader/writer interpretation certified.");
}

#[tokio::test]
async fn certify_release_leaves_no_residue() {
    println!("\n🧹 [PROVING_GROUNDS]: Auditing acquire→release residue...");

    let database_url = "file::mem_lock_residue?mode=memory&cache=shared";
    let client = DbClient::connect(database_url, None, 10).await.unwrap();
    let kv = connect_kv("memory://proving").await.unwrap();
    let repo = Arc::new(LockRepository::new(client));
    let manager = LockManager::new(kv.clone(), repo.clone(), 300, 5);

    let twin = Uuid::new_v4();
    let lock_id = manager
        .acquire(twin, Uuid::new_v4(), Uuid::new_v4(), components(&["frame"]), LockType::Exclusive, 300)
        .await
        .unwrap();

    manager.release(lock_id).await.unwrap();

    // Sin key KV, sin fila activa y el segundo release responde NotFound.
    assert!(kv.fetch(&twin_lock_key(twin)).await.unwrap().is_none());
    assert!(!repo.find_shadow(lock_id).await.unwrap().unwrap().is_active);
    assert!(matches!(manager.release(lock_id).await, Err(LockFault::NotFound)));

    println!("   ✅ [SUCCESS]: No KV key, no active shadow row after release.");
}

#[tokio::test]
async fn certify_expiry_and_reaper_harvest() {
    println!("\n💀 [PROVING_GROUNDS]: Auditing TTL expiry and reaper sweep...");

    // 1. SETUP: estado completo con reaper de cadencia 1s y gracia 1s.
    let database_url = "file::mem_lock_reaper?mode=memory&cache=shared";
    let config = proving_config(database_url);
    let client = DbClient::connect(database_url, None, 10).await.unwrap();
    let kv = connect_kv("memory://proving-reaper").await.unwrap();
    let state = AppState::new(client, kv.clone(), config);

    let twin = Uuid::new_v4();

    // 2. EXECUTION: candado de 2s sin latidos.
    let lock_id = state
        .lock_manager
        .acquire(twin, Uuid::new_v4(), Uuid::new_v4(), components(&["head"]), LockType::Exclusive, 2)
        .await
        .unwrap();

    spawn_lock_reaper(state.clone()).await;
    tokio::time::sleep(std::time::Duration::from_secs(4)).await;

    // 3. VALIDATION: key KV ausente, sombra inactiva, heartbeat expira.
    assert!(kv.fetch(&twin_lock_key(twin)).await.unwrap().is_none());
    let shadow = state.lock_repository.find_shadow(lock_id).await.unwrap().unwrap();
    assert!(!shadow.is_active);
    assert!(matches!(state.lock_manager.heartbeat(lock_id).await, Err(LockFault::NotFound)));

    // 4. La re-adquisición del mismo componente procede sin fricción.
    state
        .lock_manager
        .acquire(twin, Uuid::new_v4(), Uuid::new_v4(), components(&["head"]), LockType::Exclusive, 300)
        .await
        .expect("re-adquisición tras cosecha");

    println!("   ✅ [SUCCESS]: Orphan lock harvested, lease slot recycled.");
}

#[tokio::test]
async fn certify_heartbeat_extends_live_lease() {
    println!("\n💓 [PROVING_GROUNDS]: Auditing heartbeat lease extension...");

    let (kv, manager) = proving_manager("file::mem_lock_hb?mode=memory&cache=shared").await;
    let twin = Uuid::new_v4();

    let lock_id = manager
        .acquire(twin, Uuid::new_v4(), Uuid::new_v4(), components(&["axis.z"]), LockType::Exclusive, 300)
        .await
        .unwrap();

    manager.heartbeat(lock_id).await.expect("latido sobre arrendamiento vivo");
    assert!(kv.fetch(&twin_lock_key(twin)).await.unwrap().is_some());

    // Un candado inexistente responde NotFound, no Expired.
    assert!(matches!(manager.heartbeat(Uuid::new_v4()).await, Err(LockFault::NotFound)));

    println!("   ✅ [SUCCESS]: Lease extended by the full original TTL.");
}
