// [apps/orchestrator/src/handlers/stream.rs]
/*!
 * =================================================================
 * APARATO: DUPLEX COLLABORATION SOCKET (V4.2)
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: ENLACE FULL-DUPLEX DE SESIÓN Y RUTEO DE FRAMES
 *
 * # Mathematical Proof (Asynchronous Determinism):
 * La escritura se desacopla mediante una cola mpsc acotada por sesión:
 * el transporte encola sin bloquear y una única tarea escritora drena
 * hacia el socket, preservando FIFO por transporte. Una cola saturada
 * equivale a un par muerto: el registro lo poda en el siguiente barrido.
 * =================================================================
 */

use crate::state::connection_registry::{DuplexTransport, TransportFault};
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use twinforge_domain_models::frames::{ClientFrame, ServerFrame, CLOSE_CODE_INVALID_SESSION};
use twinforge_domain_models::identity::ResolvedIdentity;
use uuid::Uuid;

/// Capacidad de la cola de salida por sesión. Una cola desbordada marca
/// al suscriptor lento como par muerto.
const OUTBOUND_QUEUE_CAPACITY: usize = 64;

enum OutboundCommand {
    Frame(String),
    Close(u16),
}

/// Implementación WebSocket de la capacidad estrecha de transporte.
struct WsTransport {
    outbound_queue: mpsc::Sender<OutboundCommand>,
}

#[async_trait]
impl DuplexTransport for WsTransport {
    async fn send_frame(&self, frame: &str) -> Result<(), TransportFault> {
        self.outbound_queue
            .try_send(OutboundCommand::Frame(frame.to_string()))
            .map_err(|queue_fault| TransportFault(queue_fault.to_string()))
    }

    async fn close(&self, code: u16) {
        let _ = self.outbound_queue.try_send(OutboundCommand::Close(code));
    }
}

/// Endpoint: GET /ws/{session_id} — negociación del enlace duplex.
#[instrument(skip(websocket_upgrade, application_state))]
pub async fn handle_duplex_upgrade(
    Path(session_id): Path<Uuid>,
    State(application_state): State<AppState>,
    websocket_upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    websocket_upgrade
        .on_upgrade(move |socket| handle_active_link(socket, application_state, session_id))
}

async fn handle_active_link(socket: WebSocket, application_state: AppState, session_id: Uuid) {
    let (mut socket_sender, mut socket_receiver) = socket.split();

    // 1. VALIDACIÓN DE SESIÓN: inválida o expirada → cierre 1008.
    let identity = match application_state.identity_repository.resolve_session(session_id).await {
        Ok(Some(identity)) => identity,
        _ => {
            warn!("⛔ [DUPLEX]: Session {} rejected at upgrade.", session_id);
            let _ = socket_sender
                .send(Message::Close(Some(CloseFrame {
                    code: CLOSE_CODE_INVALID_SESSION,
                    reason: "invalid or expired session".into(),
                })))
                .await;
            return;
        }
    };

    info!("⚡ [DUPLEX]: Link open for session {} (operator {}).", session_id, identity.username);

    // 2. COLA DE SALIDA ACOTADA + TAREA ESCRITORA (FIFO por transporte)
    let (outbound_sender, mut outbound_receiver) =
        mpsc::channel::<OutboundCommand>(OUTBOUND_QUEUE_CAPACITY);

    let mut writer_task = tokio::spawn(async move {
        while let Some(command) = outbound_receiver.recv().await {
            match command {
                OutboundCommand::Frame(frame) => {
                    if socket_sender.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                OutboundCommand::Close(code) => {
                    let _ = socket_sender
                        .send(Message::Close(Some(CloseFrame { code, reason: "".into() })))
                        .await;
                    break;
                }
            }
        }
    });

    let transport = std::sync::Arc::new(WsTransport { outbound_queue: outbound_sender });
    application_state.connection_registry.attach(session_id, identity.user_id, transport.clone());

    // 3. BUCLE LECTOR: ruteo de frames del cliente.
    while let Some(network_read) = socket_receiver.next().await {
        match network_read {
            Ok(Message::Text(raw_frame)) => {
                dispatch_client_frame(&application_state, &identity, &raw_frame).await;
            }
            Ok(Message::Close(_)) => {
                debug!("🔌 [DUPLEX]: Close signal from session {}.", session_id);
                break;
            }
            Err(physical_fault) => {
                warn!("❌ [DUPLEX]: Session {} network fault: {}", session_id, physical_fault);
                break;
            }
            // Binary/Ping/Pong se descartan en este estrato.
            _ => {}
        }
    }

    // 4. LIMPIEZA DETERMINISTA
    application_state.connection_registry.detach(session_id);
    writer_task.abort();
    let _ = (&mut writer_task).await;
    info!("💀 [DUPLEX]: Session {} resources released.", session_id);
}

async fn dispatch_client_frame(
    application_state: &AppState,
    identity: &ResolvedIdentity,
    raw_frame: &str,
) {
    let frame: ClientFrame = match serde_json::from_str(raw_frame) {
        Ok(frame) => frame,
        Err(decode_fault) => {
            debug!("⚠️ [DUPLEX]: Undecodable frame from {}: {}", identity.session_id, decode_fault);
            return;
        }
    };

    match frame {
        ClientFrame::Subscribe { twin_id } => {
            if application_state.connection_registry.subscribe(identity.session_id, twin_id) {
                let acknowledgement = ServerFrame::Subscribed { twin_id }.to_wire();
                application_state.connection_registry.send(identity.session_id, &acknowledgement).await;
            }
        }
        ClientFrame::Unsubscribe { twin_id } => {
            application_state.connection_registry.unsubscribe(identity.session_id, twin_id);
        }
        ClientFrame::Heartbeat => {
            let pong = ServerFrame::Pong.to_wire();
            application_state.connection_registry.send(identity.session_id, &pong).await;
        }
        ClientFrame::CursorMove { twin_id, position } => {
            // Presencia: mejor esfuerzo hacia los demás suscriptores.
            let cursor_frame =
                ServerFrame::CursorUpdate { user_id: identity.user_id, position }.to_wire();
            application_state
                .connection_registry
                .broadcast(twin_id, &cursor_frame, Some(identity.session_id))
                .await;
        }
    }
}
