// [libs/infra/kv/src/redis_kv.rs]
/*!
 * =================================================================
 * APARATO: REDIS KV BACKEND (V4.1)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CAS POR SCRIPT, ARRENDAMIENTOS PX Y CANALES PUBSUB
 *
 * El gestor de conexión multiplexa todos los comandos sobre un único
 * enlace TCP con reconexión automática; las suscripciones pub/sub abren
 * su propia conexión dedicada, como exige el protocolo de Redis.
 * =================================================================
 */

use crate::{KvError, KvStratum, KvSubscription};
use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::Script;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Capacidad del buffer de entrega de una suscripción.
const SUBSCRIPTION_BUFFER_CAPACITY: usize = 256;

/// Guion compare-and-set: reemplaza el valor solo si el testigo coincide.
const COMPARE_AND_SET_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if current == ARGV[1] then
  redis.call('SET', KEYS[1], ARGV[2], 'PX', ARGV[3])
  return 1
end
return 0
"#;

pub struct RedisKv {
    command_manager: ConnectionManager,
    /// Cliente raíz: las suscripciones requieren conexiones dedicadas.
    subscription_client: redis::Client,
    compare_and_set: Script,
}

impl RedisKv {
    #[instrument(skip(kv_connection_url))]
    pub async fn connect(kv_connection_url: &str) -> Result<Self, KvError> {
        let subscription_client = redis::Client::open(kv_connection_url)
            .map_err(|fault| KvError::ConnectionError(fault.to_string()))?;

        let command_manager = ConnectionManager::new(subscription_client.clone())
            .await
            .map_err(|fault| KvError::ConnectionError(fault.to_string()))?;

        info!("🔌 [KV_STRATUM]: Redis uplink established and multiplexed.");

        Ok(Self {
            command_manager,
            subscription_client,
            compare_and_set: Script::new(COMPARE_AND_SET_SCRIPT),
        })
    }
}

#[async_trait]
impl KvStratum for RedisKv {
    async fn fetch(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut connection = self.command_manager.clone();
        let payload: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut connection)
            .await?;
        Ok(payload)
    }

    async fn install(
        &self,
        key: &str,
        witnessed: Option<&str>,
        payload: &str,
        ttl: Duration,
    ) -> Result<bool, KvError> {
        let mut connection = self.command_manager.clone();
        let ttl_milliseconds = ttl.as_millis().max(1) as u64;

        match witnessed {
            // Creación condicionada a ausencia: SET NX PX.
            None => {
                let outcome: Option<String> = redis::cmd("SET")
                    .arg(key)
                    .arg(payload)
                    .arg("NX")
                    .arg("PX")
                    .arg(ttl_milliseconds)
                    .query_async(&mut connection)
                    .await?;
                Ok(outcome.is_some())
            }
            // Reemplazo condicionado al testigo: script atómico.
            Some(witnessed_payload) => {
                let installed: i64 = self
                    .compare_and_set
                    .key(key)
                    .arg(witnessed_payload)
                    .arg(payload)
                    .arg(ttl_milliseconds)
                    .invoke_async(&mut connection)
                    .await?;
                Ok(installed == 1)
            }
        }
    }

    async fn extend_ttl(&self, key: &str, ttl: Duration) -> Result<bool, KvError> {
        let mut connection = self.command_manager.clone();
        let extended: i64 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl.as_millis().max(1) as u64)
            .query_async(&mut connection)
            .await?;
        Ok(extended == 1)
    }

    async fn remove(&self, key: &str) -> Result<(), KvError> {
        let mut connection = self.command_manager.clone();
        let _: i64 = redis::cmd("DEL").arg(key).query_async(&mut connection).await?;
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), KvError> {
        let mut connection = self.command_manager.clone();
        let _: i64 = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async(&mut connection)
            .await?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<KvSubscription, KvError> {
        let mut pubsub_connection = self
            .subscription_client
            .get_async_pubsub()
            .await
            .map_err(|fault| KvError::SubscriptionError(fault.to_string()))?;

        pubsub_connection
            .subscribe(channel)
            .await
            .map_err(|fault| KvError::SubscriptionError(fault.to_string()))?;

        let (delivery_sender, delivery_receiver) = mpsc::channel(SUBSCRIPTION_BUFFER_CAPACITY);
        let channel_label = channel.to_string();

        // Bomba de mensajes: conexión dedicada -> buffer del suscriptor.
        tokio::spawn(async move {
            let mut message_stream = pubsub_connection.on_message();
            while let Some(message) = message_stream.next().await {
                let payload: String = match message.get_payload() {
                    Ok(payload) => payload,
                    Err(decode_fault) => {
                        warn!("⚠️ [KV_SUB]: Undecodable frame on {}: {}", channel_label, decode_fault);
                        continue;
                    }
                };
                if delivery_sender.send(payload).await.is_err() {
                    debug!("🔌 [KV_SUB]: Subscriber for {} departed; pump closing.", channel_label);
                    break;
                }
            }
            debug!("🔌 [KV_SUB]: Message stream for {} terminated.", channel_label);
        });

        Ok(delivery_receiver)
    }

    async fn probe(&self) -> bool {
        let mut connection = self.command_manager.clone();
        let response: Result<String, _> = redis::cmd("PING").query_async(&mut connection).await;
        matches!(response.as_deref(), Ok("PONG"))
    }
}
