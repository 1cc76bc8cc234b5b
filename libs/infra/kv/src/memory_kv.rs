// [libs/infra/kv/src/memory_kv.rs]
/*!
 * =================================================================
 * APARATO: IN-PROCESS KV BACKEND (V4.1)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: RÉPLICA FUNCIONAL DEL CONTRATO KV EN MEMORIA LOCAL
 *
 * Seleccionado por URLs `memory://`: proving grounds y despliegues
 * mono-nodo. La expiración es perezosa (se evalúa en cada acceso), con
 * la misma semántica observable que los arrendamientos PX de Redis.
 * =================================================================
 */

use crate::{KvError, KvStratum, KvSubscription};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

/// Capacidad de los canales de difusión internos.
const CHANNEL_CAPACITY: usize = 256;

struct MemoryEntry {
    payload: String,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, MemoryEntry>>,
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_payload(guard: &mut HashMap<String, MemoryEntry>, key: &str) -> Option<String> {
        let now = Instant::now();
        let lease_lapsed = matches!(guard.get(key), Some(entry) if !entry.is_live(now));
        if lease_lapsed {
            // Evicción perezosa del arrendamiento lapso.
            guard.remove(key);
            return None;
        }
        guard.get(key).map(|entry| entry.payload.clone())
    }
}

#[async_trait]
impl KvStratum for MemoryKv {
    async fn fetch(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|poison| KvError::CommandError(format!("LOCK_POISONED: {}", poison)))?;
        Ok(Self::live_payload(&mut guard, key))
    }

    async fn install(
        &self,
        key: &str,
        witnessed: Option<&str>,
        payload: &str,
        ttl: Duration,
    ) -> Result<bool, KvError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|poison| KvError::CommandError(format!("LOCK_POISONED: {}", poison)))?;

        let current = Self::live_payload(&mut guard, key);
        let witness_matches = match (witnessed, current.as_deref()) {
            (None, None) => true,
            (Some(expected), Some(actual)) => expected == actual,
            _ => false,
        };

        if !witness_matches {
            return Ok(false);
        }

        guard.insert(
            key.to_string(),
            MemoryEntry { payload: payload.to_string(), expires_at: Instant::now() + ttl },
        );
        Ok(true)
    }

    async fn extend_ttl(&self, key: &str, ttl: Duration) -> Result<bool, KvError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|poison| KvError::CommandError(format!("LOCK_POISONED: {}", poison)))?;

        if Self::live_payload(&mut guard, key).is_none() {
            return Ok(false);
        }

        if let Some(entry) = guard.get_mut(key) {
            entry.expires_at = Instant::now() + ttl;
        }
        Ok(true)
    }

    async fn remove(&self, key: &str) -> Result<(), KvError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|poison| KvError::CommandError(format!("LOCK_POISONED: {}", poison)))?;
        guard.remove(key);
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), KvError> {
        let sender = {
            let guard = self
                .channels
                .lock()
                .map_err(|poison| KvError::CommandError(format!("LOCK_POISONED: {}", poison)))?;
            guard.get(channel).cloned()
        };

        // Sin suscriptores el mensaje se descarta, igual que en Redis.
        if let Some(sender) = sender {
            let _ = sender.send(payload.to_string());
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<KvSubscription, KvError> {
        let mut broadcast_receiver = {
            let mut guard = self
                .channels
                .lock()
                .map_err(|poison| KvError::CommandError(format!("LOCK_POISONED: {}", poison)))?;
            guard
                .entry(channel.to_string())
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                .subscribe()
        };

        let (delivery_sender, delivery_receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let channel_label = channel.to_string();

        tokio::spawn(async move {
            loop {
                match broadcast_receiver.recv().await {
                    Ok(payload) => {
                        if delivery_sender.send(payload).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed_count)) => {
                        debug!("🐢 [KV_SUB]: Channel {} dropped {} frames.", channel_label, missed_count);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(delivery_receiver)
    }

    async fn probe(&self) -> bool {
        true
    }
}
