// [libs/infra/kv/src/lib.rs]
/*!
 * =================================================================
 * APARATO: DISTRIBUTED KV STRATUM (V4.1)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CAPACIDAD CAS+TTL+PUBSUB SOBRE BACKENDS INTERCAMBIABLES
 *
 * # Mathematical Proof (Atomic Install):
 * `install` compara el valor testigo leído por el llamador con el valor
 * vigente y lo reemplaza en la misma operación atómica (SET NX / script
 * compare-and-set). Un registro jamás se reescribe read-modify-write sin
 * reintento: toda carrera se detecta como testigo desfasado.
 * =================================================================
 */

pub mod errors;
pub mod memory_kv;
pub mod redis_kv;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub use errors::KvError;
pub use memory_kv::MemoryKv;
pub use redis_kv::RedisKv;

/// Flujo de mensajes entrante de una suscripción pub/sub.
pub type KvSubscription = mpsc::Receiver<String>;

/// Capacidad mínima que el resto del sistema exige al almacén clave/valor.
#[async_trait]
pub trait KvStratum: Send + Sync {
    /// Lee el payload vigente de un key (testigo para un CAS posterior).
    async fn fetch(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Instalación atómica condicionada al testigo:
    /// - `witnessed = None`: crea solo si el key está ausente (SET NX).
    /// - `witnessed = Some(raw)`: reemplaza solo si el valor vigente es `raw`.
    ///
    /// Retorna `false` cuando el testigo quedó desfasado; el llamador relee
    /// y reintenta bajo su propia política.
    async fn install(
        &self,
        key: &str,
        witnessed: Option<&str>,
        payload: &str,
        ttl: Duration,
    ) -> Result<bool, KvError>;

    /// Extiende el arrendamiento del key por el TTL completo.
    /// `false` cuando el key ya no existe (arrendamiento lapso).
    async fn extend_ttl(&self, key: &str, ttl: Duration) -> Result<bool, KvError>;

    /// Elimina el key; silencioso si no existe.
    async fn remove(&self, key: &str) -> Result<(), KvError>;

    /// Publica un payload en el canal dado.
    async fn publish(&self, channel: &str, payload: &str) -> Result<(), KvError>;

    /// Abre una suscripción viva al canal dado.
    async fn subscribe(&self, channel: &str) -> Result<KvSubscription, KvError>;

    /// Sonda de vitalidad para el endpoint de salud.
    async fn probe(&self) -> bool;
}

/// Forja el backend según el esquema de la URL: `memory://` selecciona el
/// estrato en proceso (tests y despliegues mono-nodo), todo lo demás Redis.
pub async fn connect_kv(kv_connection_url: &str) -> Result<Arc<dyn KvStratum>, KvError> {
    if kv_connection_url.starts_with("memory://") {
        Ok(Arc::new(MemoryKv::new()))
    } else {
        Ok(Arc::new(RedisKv::connect(kv_connection_url).await?))
    }
}
