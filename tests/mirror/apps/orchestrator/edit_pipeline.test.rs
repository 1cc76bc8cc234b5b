// [tests/mirror/apps/orchestrator/edit_pipeline.test.rs]
/**
 * =================================================================
 * APARATO: EDIT PIPELINE TEST (V4.0)
 * CLASIFICACIÓN: PROVING GROUNDS // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE CANDADO, RELOJ Y FAN-OUT DE EDICIONES
 * =================================================================
 */

use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use twinforge_domain_models::edit::SubmitEditPayload;
use twinforge_domain_models::identity::ResolvedIdentity;
use twinforge_domain_models::lock::LockType;
use twinforge_domain_models::twin::CreateTwinPayload;
use twinforge_infra_db::DbClient;
use twinforge_infra_kv::connect_kv;
use twinforge_orchestrator::config::OrchestratorConfig;
use twinforge_orchestrator::errors::CollabError;
use twinforge_orchestrator::services::edit_pipeline::submit_edit;
use twinforge_orchestrator::state::connection_registry::{DuplexTransport, TransportFault};
use twinforge_orchestrator::state::AppState;
use uuid::Uuid;

#[derive(Default)]
struct RecordingTransport {
    frames: Mutex<Vec<String>>,
}

impl RecordingTransport {
    fn recorded(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }
}

#[async_trait]
impl DuplexTransport for RecordingTransport {
    async fn send_frame(&self, frame: &str) -> Result<(), TransportFault> {
        self.frames.lock().unwrap().push(frame.to_string());
        Ok(())
    }

    async fn close(&self, _code: u16) {}
}

fn proving_config(database_url: &str) -> OrchestratorConfig {
    OrchestratorConfig {
        database_connection_url: database_url.to_string(),
        database_access_token: None,
        kv_connection_url: "memory://proving".to_string(),
        listening_network_port: 0,
        db_max_connections: 10,
        lock_ttl_seconds: 300,
        lock_heartbeat_grace_seconds: 30,
        lock_reaper_interval_seconds: 30,
        lock_cas_retry_limit: 5,
        ws_heartbeat_interval_seconds: 15,
        session_ttl_seconds: 3600,
        telemetry_open_ingest: false,
    }
}

async fn proving_state(database_url: &str) -> AppState {
    let client = DbClient::connect(database_url, None, 10).await.unwrap();
    let kv = connect_kv("memory://proving").await.unwrap();
    AppState::new(client, kv, proving_config(database_url))
}

fn identity(user_id: Uuid, session_id: Uuid) -> ResolvedIdentity {
    ResolvedIdentity { user_id, session_id, username: format!("operator-{}", user_id) }
}

#[tokio::test]
async fn certify_locked_edit_fans_out_excluding_originator() {
    println!("\n📝 [PROVING_GROUNDS]: Auditing edit fan-out discipline...");

    // 1. SETUP: estado completo, gemelo y tres sesiones suscritas.
    let state = proving_state("file::mem_pipeline_fan?mode=memory&cache=shared").await;
    let author = identity(Uuid::new_v4(), Uuid::new_v4());

    let (twin, _) = state
        .twin_repository
        .create_twin(
            author.user_id,
            CreateTwinPayload {
                name: "press-12".into(),
                description: None,
                twin_type: "hydraulic_press".into(),
                properties: json!({"chassis": {"bolt1": {"torque": 90}}}),
                tags: vec![],
            },
        )
        .await
        .unwrap();

    let transports: Vec<Arc<RecordingTransport>> =
        (0..3).map(|_| Arc::new(RecordingTransport::default())).collect();
    let sessions = [author.session_id, Uuid::new_v4(), Uuid::new_v4()];
    for (session, transport) in sessions.iter().zip(&transports) {
        state.connection_registry.attach(*session, Uuid::new_v4(), transport.clone());
        assert!(state.connection_registry.subscribe(*session, twin.twin_id));
    }

    // 2. CANDADO HABILITANTE sobre el subárbol editado.
    let lock_components: BTreeSet<String> = ["chassis".to_string()].into_iter().collect();
    state
        .lock_manager
        .acquire(twin.twin_id, author.user_id, author.session_id, lock_components, LockType::Exclusive, 300)
        .await
        .unwrap();

    // 3. EXECUTION: edición sobre chassis.bolt1 (cubierta por "chassis").
    let operation = submit_edit(
        &state,
        &author,
        SubmitEditPayload {
            twin_id: twin.twin_id,
            operation_type: "set_property".into(),
            component_path: "chassis.bolt1".into(),
            operation_data: json!({"torque": 95}),
            vector_clock: None,
        },
    )
    .await
    .expect("edición autorizada");

    // 4. VALIDATION: S2 y S3 reciben exactamente un frame con el op_id;
    // el originador no recibe nada.
    assert!(transports[0].recorded().is_empty());
    for transport in &transports[1..] {
        let frames = transport.recorded();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains(r#""type":"edit_operation""#));
        assert!(frames[0].contains(&operation.op_id.to_string()));
    }

    // 5. El reloj sellado porta el contador del autor.
    assert_eq!(operation.vector_clock.0.get(&author.user_id), Some(&1));

    println!("   ✅ [SUCCESS]: Fan-out reached 2 peers, originator excluded.");
}

#[tokio::test]
async fn certify_unlocked_edit_is_rejected() {
    println!("\n⛔ [PROVING_GROUNDS]: Auditing lock gate on the edit path...");

    let state = proving_state("file::mem_pipeline_gate?mode=memory&cache=shared").await;
    let author = identity(Uuid::new_v4(), Uuid::new_v4());

    let (twin, _) = state
        .twin_repository
        .create_twin(
            author.user_id,
            CreateTwinPayload {
                name: "lathe-3".into(),
                description: None,
                twin_type: "lathe".into(),
                properties: json!({}),
                tags: vec![],
            },
        )
        .await
        .unwrap();

    // 1. Sin candado → Unauthorized.
    let rejected = submit_edit(
        &state,
        &author,
        SubmitEditPayload {
            twin_id: twin.twin_id,
            operation_type: "set_property".into(),
            component_path: "spindle.speed".into(),
            operation_data: json!({"rpm": 1200}),
            vector_clock: None,
        },
    )
    .await;
    assert!(matches!(rejected, Err(CollabError::Auth(_))));

    // 2. Candado de OTRA sesión tampoco habilita al autor.
    let stranger_session = Uuid::new_v4();
    let lock_components: BTreeSet<String> = ["spindle".to_string()].into_iter().collect();
    state
        .lock_manager
        .acquire(twin.twin_id, Uuid::new_v4(), stranger_session, lock_components, LockType::Exclusive, 300)
        .await
        .unwrap();

    let still_rejected = submit_edit(
        &state,
        &author,
        SubmitEditPayload {
            twin_id: twin.twin_id,
            operation_type: "set_property".into(),
            component_path: "spindle.speed".into(),
            operation_data: json!({"rpm": 1200}),
            vector_clock: None,
        },
    )
    .await;
    assert!(matches!(still_rejected, Err(CollabError::Auth(_))));

    // 3. Gemelo inexistente → NotFound antes que Auth.
    let ghost = submit_edit(
        &state,
        &author,
        SubmitEditPayload {
            twin_id: Uuid::new_v4(),
            operation_type: "set_property".into(),
            component_path: "x".into(),
            operation_data: json!({}),
            vector_clock: None,
        },
    )
    .await;
    assert!(matches!(ghost, Err(CollabError::NotFound)));

    println!("   ✅ [SUCCESS]: Edit gate enforces session-owned covering lock.");
}

#[tokio::test]
async fn certify_vector_clock_watermark_merge() {
    println!("\n🕰️  [PROVING_GROUNDS]: Auditing causal stamp discipline...");

    let state = proving_state("file::mem_pipeline_clock?mode=memory&cache=shared").await;
    let alice = identity(Uuid::new_v4(), Uuid::new_v4());
    let bob = identity(Uuid::new_v4(), Uuid::new_v4());

    let (twin, _) = state
        .twin_repository
        .create_twin(
            alice.user_id,
            CreateTwinPayload {
                name: "robot-arm".into(),
                description: None,
                twin_type: "robot".into(),
                properties: json!({}),
                tags: vec![],
            },
        )
        .await
        .unwrap();

    let arm: BTreeSet<String> = ["arm".to_string()].into_iter().collect();
    state
        .lock_manager
        .acquire(twin.twin_id, alice.user_id, alice.session_id, arm.clone(), LockType::Shared, 300)
        .await
        .unwrap();
    state
        .lock_manager
        .acquire(twin.twin_id, bob.user_id, bob.session_id, arm, LockType::Shared, 300)
        .await
        .unwrap();

    let payload = |path: &str| SubmitEditPayload {
        twin_id: twin.twin_id,
        operation_type: "set_property".into(),
        component_path: path.into(),
        operation_data: json!({"v": 1}),
        vector_clock: None,
    };

    let first = submit_edit(&state, &alice, payload("arm.joint1")).await.unwrap();
    let second = submit_edit(&state, &bob, payload("arm.joint2")).await.unwrap();

    // La segunda operación domina causalmente a la primera y el orden
    // total respeta la secuencia de inserción.
    assert!(first.vector_clock.happened_before_or_equal(&second.vector_clock));
    assert!(second.op_seq > first.op_seq);
    assert_eq!(second.vector_clock.0.get(&alice.user_id), Some(&1));
    assert_eq!(second.vector_clock.0.get(&bob.user_id), Some(&1));

    println!("   ✅ [SUCCESS]: Stored clocks form a linear causal extension.");
}
