// [tests/mirror/libs/infra/db/twin_versioning.test.rs]
/**
 * =================================================================
 * APARATO: TWIN VERSIONING TEST (V4.0)
 * CLASIFICACIÓN: PROVING GROUNDS // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DEL MARCADOR is_latest TRANSACCIONAL
 * =================================================================
 */

use serde_json::json;
use twinforge_domain_models::twin::{CreateTwinPayload, CreateVersionPayload};
use twinforge_infra_db::repositories::TwinRepository;
use twinforge_infra_db::DbClient;
use uuid::Uuid;

#[tokio::test]
async fn certify_single_latest_marker_invariant() {
    println!("\n🌐 [PROVING_GROUNDS]: Auditing twin version linearity...");

    // 1. SETUP: ledger en memoria compartida.
    let client = DbClient::connect("file::mem_twin_v4?mode=memory&cache=shared", None, 10)
        .await
        .unwrap();
    let repo = TwinRepository::new(client.clone());
    let owner = Uuid::new_v4();

    // 2. EXECUTION: génesis + dos versiones sucesivas.
    let (twin, genesis) = repo
        .create_twin(
            owner,
            CreateTwinPayload {
                name: "cnc-mill-07".into(),
                description: Some("5-axis mill".into()),
                twin_type: "cnc_machine".into(),
                properties: json!({"spindle": {"rpm_max": 24000}}),
                tags: vec!["line-a".into()],
            },
        )
        .await
        .expect("Fallo en génesis");
    assert!(genesis.is_latest);
    assert_eq!(genesis.version_number, 1);

    for revision in 2..=3i64 {
        let version = repo
            .create_version(
                twin.twin_id,
                owner,
                CreateVersionPayload {
                    commit_message: format!("revision {}", revision),
                    model_url: None,
                    model_format: None,
                    properties: json!({"revision": revision}),
                },
            )
            .await
            .expect("Fallo en versión");
        assert_eq!(version.version_number, revision);
    }

    // 3. VALIDATION: exactamente un marcador vigente, número monótono.
    assert_eq!(repo.latest_marker_count(twin.twin_id).await.unwrap(), 1);
    let latest = repo.latest_version(twin.twin_id).await.unwrap().expect("versión vigente");
    assert_eq!(latest.version_number, 3);
    assert_eq!(repo.fetch_twin(twin.twin_id).await.unwrap().unwrap().version_number, 3);

    println!("   ✅ [SUCCESS]: is_latest marker unique across {} versions.", 3);
}

#[tokio::test]
async fn certify_version_on_unknown_twin_is_not_found() {
    let client = DbClient::connect("file::mem_twin_nf?mode=memory&cache=shared", None, 10)
        .await
        .unwrap();
    let repo = TwinRepository::new(client);

    let outcome = repo
        .create_version(
            Uuid::new_v4(),
            Uuid::new_v4(),
            CreateVersionPayload {
                commit_message: "ghost".into(),
                model_url: None,
                model_format: None,
                properties: json!({}),
            },
        )
        .await;

    assert!(matches!(outcome, Err(twinforge_infra_db::DbError::NotFound)));
}
