// [apps/orchestrator/src/state/connection_registry.rs]
/*!
 * =================================================================
 * APARATO: CONNECTION REGISTRY (V4.2)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L4)
 * RESPONSABILIDAD: ÍNDICES DE SESIÓN Y DIFUSIÓN CON PODA DE PARES MUERTOS
 *
 * Tres índices bajo un único cerrojo grueso: sesión → transporte,
 * usuario → sesiones, gemelo → suscriptores. Las mutaciones de membresía
 * son O(1). El bucle de difusión programa contra la capacidad estrecha
 * `DuplexTransport`, nunca contra un transporte concreto: los frames se
 * encolan fuera del cerrojo y todo envío fallido marca la sesión para
 * desconexión al final del barrido.
 * =================================================================
 */

use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Fallo de la capa física de un transporte duplex.
#[derive(Debug)]
pub struct TransportFault(pub String);

/// Capacidad estrecha de un transporte duplex de sesión.
#[async_trait]
pub trait DuplexTransport: Send + Sync {
    /// Encola un frame serializado hacia el par. FIFO por transporte.
    async fn send_frame(&self, frame: &str) -> Result<(), TransportFault>;
    /// Cierra el enlace con el código de protocolo dado.
    async fn close(&self, code: u16);
}

struct ActiveConnection {
    user_id: Uuid,
    transport: std::sync::Arc<dyn DuplexTransport>,
    subscribed_twins: HashSet<Uuid>,
}

#[derive(Default)]
struct RegistryIndices {
    connections: HashMap<Uuid, ActiveConnection>,
    user_sessions: HashMap<Uuid, HashSet<Uuid>>,
    twin_subscribers: HashMap<Uuid, HashSet<Uuid>>,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    indices: RwLock<RegistryIndices>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra una sesión con su transporte. Idempotente: un re-attach
    /// reemplaza el transporte y preserva las suscripciones vigentes.
    pub fn attach(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        transport: std::sync::Arc<dyn DuplexTransport>,
    ) {
        let mut indices = match self.indices.write() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        };

        match indices.connections.entry(session_id) {
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get_mut();
                existing.transport = transport;
                existing.user_id = user_id;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(ActiveConnection {
                    user_id,
                    transport,
                    subscribed_twins: HashSet::new(),
                });
            }
        }

        indices.user_sessions.entry(user_id).or_default().insert(session_id);
        info!("🔗 [REGISTRY]: Session {} attached for operator {}.", session_id, user_id);
    }

    /// Elimina la sesión de los tres índices. Seguro ante desconocidas.
    pub fn detach(&self, session_id: Uuid) {
        let mut indices = match self.indices.write() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        };

        let Some(connection) = indices.connections.remove(&session_id) else {
            return;
        };

        let user_drained = indices
            .user_sessions
            .get_mut(&connection.user_id)
            .map(|sessions| {
                sessions.remove(&session_id);
                sessions.is_empty()
            })
            .unwrap_or(false);
        if user_drained {
            indices.user_sessions.remove(&connection.user_id);
        }

        for twin_id in &connection.subscribed_twins {
            let twin_drained = indices
                .twin_subscribers
                .get_mut(twin_id)
                .map(|subscribers| {
                    subscribers.remove(&session_id);
                    subscribers.is_empty()
                })
                .unwrap_or(false);
            if twin_drained {
                indices.twin_subscribers.remove(twin_id);
            }
        }

        debug!("🔌 [REGISTRY]: Session {} detached.", session_id);
    }

    /// Suscribe la sesión al gemelo. `false` si la sesión no está registrada.
    pub fn subscribe(&self, session_id: Uuid, twin_id: Uuid) -> bool {
        let mut indices = match self.indices.write() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        };

        match indices.connections.get_mut(&session_id) {
            None => return false,
            Some(connection) => {
                connection.subscribed_twins.insert(twin_id);
            }
        }

        indices.twin_subscribers.entry(twin_id).or_default().insert(session_id);
        true
    }

    pub fn unsubscribe(&self, session_id: Uuid, twin_id: Uuid) {
        let mut indices = match self.indices.write() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        };

        if let Some(connection) = indices.connections.get_mut(&session_id) {
            connection.subscribed_twins.remove(&twin_id);
        }

        let twin_drained = indices
            .twin_subscribers
            .get_mut(&twin_id)
            .map(|subscribers| {
                subscribers.remove(&session_id);
                subscribers.is_empty()
            })
            .unwrap_or(false);
        if twin_drained {
            indices.twin_subscribers.remove(&twin_id);
        }
    }

    /// Difunde un frame a los suscriptores del gemelo, mejor-esfuerzo y sin
    /// orden entre pares. Todo envío fallido se poda al final del barrido.
    /// Retorna la cantidad de entregas exitosas.
    pub async fn broadcast(
        &self,
        twin_id: Uuid,
        frame: &str,
        exclude_session: Option<Uuid>,
    ) -> usize {
        // Los destinos se capturan bajo el cerrojo; el envío sucede fuera.
        let targets: Vec<(Uuid, std::sync::Arc<dyn DuplexTransport>)> = {
            let indices = match self.indices.read() {
                Ok(guard) => guard,
                Err(poison) => poison.into_inner(),
            };

            indices
                .twin_subscribers
                .get(&twin_id)
                .map(|subscribers| {
                    subscribers
                        .iter()
                        .filter(|session| Some(**session) != exclude_session)
                        .filter_map(|session| {
                            indices
                                .connections
                                .get(session)
                                .map(|connection| (*session, connection.transport.clone()))
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut delivered = 0usize;
        let mut dead_peers = Vec::new();

        for (session_id, transport) in targets {
            match transport.send_frame(frame).await {
                Ok(()) => delivered += 1,
                Err(fault) => {
                    warn!("⚠️ [REGISTRY]: Dead peer {} pruned from twin {}: {}", session_id, twin_id, fault.0);
                    dead_peers.push(session_id);
                }
            }
        }

        for session_id in dead_peers {
            self.detach(session_id);
        }

        delivered
    }

    /// Entrega punto a punto. `false` cuando la sesión no existe o el
    /// transporte falló (y fue podado).
    pub async fn send(&self, session_id: Uuid, frame: &str) -> bool {
        let transport = {
            let indices = match self.indices.read() {
                Ok(guard) => guard,
                Err(poison) => poison.into_inner(),
            };
            indices.connections.get(&session_id).map(|connection| connection.transport.clone())
        };

        match transport {
            None => false,
            Some(transport) => match transport.send_frame(frame).await {
                Ok(()) => true,
                Err(_) => {
                    self.detach(session_id);
                    false
                }
            },
        }
    }

    /// Instantánea de transportes vivos para el monitor de latidos.
    pub fn transport_snapshot(&self) -> Vec<(Uuid, std::sync::Arc<dyn DuplexTransport>)> {
        let indices = match self.indices.read() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        };
        indices
            .connections
            .iter()
            .map(|(session, connection)| (*session, connection.transport.clone()))
            .collect()
    }

    pub fn active_connection_count(&self) -> usize {
        let indices = match self.indices.read() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        };
        indices.connections.len()
    }

    /// Suscriptores vigentes de un gemelo (diagnóstico y tests).
    pub fn subscriber_count(&self, twin_id: Uuid) -> usize {
        let indices = match self.indices.read() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        };
        indices.twin_subscribers.get(&twin_id).map(HashSet::len).unwrap_or(0)
    }
}
