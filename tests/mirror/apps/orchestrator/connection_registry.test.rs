// [tests/mirror/apps/orchestrator/connection_registry.test.rs]
/**
 * =================================================================
 * APARATO: CONNECTION REGISTRY TEST (V4.0)
 * CLASIFICACIÓN: PROVING GROUNDS // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: CERTIFICACIÓN DE ÍNDICES, DIFUSIÓN Y PODA
 * =================================================================
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use twinforge_orchestrator::state::connection_registry::{
    ConnectionRegistry, DuplexTransport, TransportFault,
};
use uuid::Uuid;

/// Transporte de prueba: graba frames y puede simular un par muerto.
#[derive(Default)]
struct RecordingTransport {
    frames: Mutex<Vec<String>>,
    refuse_delivery: AtomicBool,
}

impl RecordingTransport {
    fn recorded(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }

    fn sever(&self) {
        self.refuse_delivery.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DuplexTransport for RecordingTransport {
    async fn send_frame(&self, frame: &str) -> Result<(), TransportFault> {
        if self.refuse_delivery.load(Ordering::SeqCst) {
            return Err(TransportFault("simulated severed link".into()));
        }
        self.frames.lock().unwrap().push(frame.to_string());
        Ok(())
    }

    async fn close(&self, _code: u16) {}
}

#[tokio::test]
async fn certify_detach_idempotence_and_broadcast_hygiene() {
    println!("\n🔗 [PROVING_GROUNDS]: Auditing attach/detach idempotence...");

    let registry = ConnectionRegistry::new();
    let twin = Uuid::new_v4();
    let session = Uuid::new_v4();
    let transport = Arc::new(RecordingTransport::default());

    // 1. attach + subscribe; el re-attach es idempotente.
    registry.attach(session, Uuid::new_v4(), transport.clone());
    registry.attach(session, Uuid::new_v4(), transport.clone());
    assert!(registry.subscribe(session, twin));
    assert_eq!(registry.active_connection_count(), 1);

    // 2. detach doble: el segundo es silencioso.
    registry.detach(session);
    registry.detach(session);
    assert_eq!(registry.active_connection_count(), 0);

    // 3. Una difusión posterior jamás alcanza a la sesión desenganchada.
    let delivered = registry.broadcast(twin, "{\"type\":\"ping\"}", None).await;
    assert_eq!(delivered, 0);
    assert!(transport.recorded().is_empty());

    println!("   ✅ [SUCCESS]: Double detach silent, no ghost deliveries.");
}

#[tokio::test]
async fn certify_broadcast_exclusion_and_dead_peer_pruning() {
    println!("\n📡 [PROVING_GROUNDS]: Auditing fan-out and dead peer pruning...");

    let registry = ConnectionRegistry::new();
    let twin = Uuid::new_v4();

    let sessions: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
    let transports: Vec<Arc<RecordingTransport>> =
        (0..3).map(|_| Arc::new(RecordingTransport::default())).collect();

    for (session, transport) in sessions.iter().zip(&transports) {
        registry.attach(*session, Uuid::new_v4(), transport.clone());
        assert!(registry.subscribe(*session, twin));
    }

    // 1. Difusión con exclusión del originador (S0).
    let delivered = registry.broadcast(twin, "frame-1", Some(sessions[0])).await;
    assert_eq!(delivered, 2);
    assert!(transports[0].recorded().is_empty());
    assert_eq!(transports[1].recorded(), vec!["frame-1"]);
    assert_eq!(transports[2].recorded(), vec!["frame-1"]);

    // 2. S2 muere: la siguiente difusión lo poda al final del barrido.
    transports[2].sever();
    let delivered = registry.broadcast(twin, "frame-2", None).await;
    assert_eq!(delivered, 2); // S0 y S1
    assert_eq!(registry.active_connection_count(), 2);
    assert_eq!(registry.subscriber_count(twin), 2);

    // 3. El par muerto ya no es destino de difusiones futuras.
    let delivered = registry.broadcast(twin, "frame-3", None).await;
    assert_eq!(delivered, 2);

    println!("   ✅ [SUCCESS]: Exclusion honored, dead peer pruned post-sweep.");
}

#[tokio::test]
async fn certify_point_to_point_send_and_unsubscribe() {
    println!("\n🎯 [PROVING_GROUNDS]: Auditing point-to-point delivery...");

    let registry = ConnectionRegistry::new();
    let twin = Uuid::new_v4();
    let session = Uuid::new_v4();
    let transport = Arc::new(RecordingTransport::default());

    registry.attach(session, Uuid::new_v4(), transport.clone());
    assert!(registry.send(session, "direct").await);
    assert!(!registry.send(Uuid::new_v4(), "ghost").await);

    // unsubscribe retira de la difusión sin tocar el enlace.
    registry.subscribe(session, twin);
    registry.unsubscribe(session, twin);
    assert_eq!(registry.broadcast(twin, "after-unsub", None).await, 0);
    assert_eq!(transport.recorded(), vec!["direct"]);
    assert_eq!(registry.active_connection_count(), 1);

    println!("   ✅ [SUCCESS]: Direct send delivered, unsubscribe scoped.");
}
