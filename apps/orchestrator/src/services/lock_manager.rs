// [apps/orchestrator/src/services/lock_manager.rs]
/*!
 * =================================================================
 * APARATO: DISTRIBUTED LOCK MANAGER (V4.3)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: CANDADOS DE COMPONENTE CON CAS, TTL Y SOMBRA SQL
 *
 * # Mathematical Proof (Conflict-Free Installation):
 * El registro agregado por gemelo vive bajo `lock:twin:<uuid>`. Adquirir
 * lee el registro (testigo), poda portadores expirados, evalúa las reglas
 * de compatibilidad y reinstala el registro con un compare-and-set: si
 * otro escritor ganó la carrera el testigo queda desfasado y el intento
 * se repite (máx. N reintentos, luego Conflict). El estado del KV es la
 * autoridad; la fila SQL es sombra durable para auditoría y reaper.
 *
 * Fallo parcial (KV instalado, SQL caído): el intento reporta fallo
 * transitorio y el residuo del KV se reconcilia por TTL.
 * =================================================================
 */

use chrono::{Duration as ChronoDuration, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use twinforge_domain_models::lock::{twin_lock_key, EditLock, LockHolder, LockType, TwinLockRecord};
use twinforge_infra_db::repositories::LockRepository;
use twinforge_infra_kv::KvStratum;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum LockFault {
    /// Contención: otro portador posee componentes solapados.
    #[error("[L4_LOCK_FAULT]: COMPONENT_CONTENTION")]
    Conflict { holder_user_id: Option<Uuid> },

    /// El candado no existe o ya fue liberado.
    #[error("[L4_LOCK_FAULT]: LOCK_NOT_FOUND")]
    NotFound,

    /// El arrendamiento KV lapsó; el llamador debe re-adquirir.
    #[error("[L4_LOCK_FAULT]: LOCK_LEASE_EXPIRED")]
    Expired,

    /// Fallo transitorio del backend (KV o SQL).
    #[error("[L4_LOCK_FAULT]: BACKEND_UNAVAILABLE -> {0}")]
    Backend(String),
}

pub struct LockManager {
    kv: Arc<dyn KvStratum>,
    lock_repository: Arc<LockRepository>,
    lock_ttl_seconds: i64,
    cas_retry_limit: usize,
}

impl LockManager {
    pub fn new(
        kv: Arc<dyn KvStratum>,
        lock_repository: Arc<LockRepository>,
        lock_ttl_seconds: i64,
        cas_retry_limit: usize,
    ) -> Self {
        Self { kv, lock_repository, lock_ttl_seconds, cas_retry_limit }
    }

    pub fn default_ttl_seconds(&self) -> i64 {
        self.lock_ttl_seconds
    }

    /// Adquiere un candado sobre el conjunto de componentes del gemelo.
    #[instrument(skip(self, components), fields(twin = %twin_id, kind = ?lock_type))]
    pub async fn acquire(
        &self,
        twin_id: Uuid,
        user_id: Uuid,
        session_id: Uuid,
        components: BTreeSet<String>,
        lock_type: LockType,
        ttl_seconds: i64,
    ) -> Result<Uuid, LockFault> {
        if components.is_empty() {
            return Err(LockFault::Conflict { holder_user_id: None });
        }

        let record_key = twin_lock_key(twin_id);
        let ttl = Duration::from_secs(ttl_seconds.max(1) as u64);

        for attempt in 0..self.cas_retry_limit {
            let now = Utc::now();

            // 1. LECTURA DEL TESTIGO + PODA DE PORTADORES LAPSOS
            let witnessed = self
                .kv
                .fetch(&record_key)
                .await
                .map_err(|fault| LockFault::Backend(fault.to_string()))?;

            let mut record = match witnessed.as_deref() {
                Some(raw) => parse_record(raw)?,
                None => TwinLockRecord::default(),
            };
            record.prune_expired(now);

            // 2. REGLAS DE COMPATIBILIDAD
            if let Some(conflicting_holder) = record.find_conflict(&components, lock_type) {
                return Err(LockFault::Conflict {
                    holder_user_id: Some(conflicting_holder.user_id),
                });
            }

            // 3. INSTALACIÓN ATÓMICA DEL PORTADOR NUEVO
            let lock_id = Uuid::new_v4();
            let holder = LockHolder {
                lock_id,
                user_id,
                session_id,
                components: components.clone(),
                acquired_at: now,
                expires_at: now + ChronoDuration::seconds(ttl_seconds.max(1)),
            };

            match lock_type {
                LockType::Exclusive => record.exclusive_holders.push(holder.clone()),
                LockType::Shared => record.shared_holders.push(holder.clone()),
            }

            let payload = encode_record(&record)?;
            let installed = self
                .kv
                .install(&record_key, witnessed.as_deref(), &payload, ttl)
                .await
                .map_err(|fault| LockFault::Backend(fault.to_string()))?;

            if !installed {
                debug!("🔁 [LOCK_MANAGER]: CAS witness drifted on attempt {}.", attempt + 1);
                continue;
            }

            // 4. SOMBRA DURABLE EN SQL
            let shadow = EditLock {
                lock_id,
                twin_id,
                user_id,
                session_id,
                components,
                lock_type,
                acquired_at: holder.acquired_at,
                expires_at: holder.expires_at,
                heartbeat_at: holder.acquired_at,
                is_active: true,
            };

            if let Err(sql_fault) = self.lock_repository.insert_shadow(&shadow).await {
                // El residuo KV se reconcilia por TTL; el intento falla transitorio.
                warn!("⚠️ [LOCK_MANAGER]: Shadow insert failed, KV residue left to TTL: {}", sql_fault);
                return Err(LockFault::Backend(sql_fault.to_string()));
            }

            info!("🔒 [LOCK_MANAGER]: Lock {} installed on twin {}.", lock_id, twin_id);
            return Ok(lock_id);
        }

        // Testigo desfasado en cada intento: contención efectiva.
        Err(LockFault::Conflict { holder_user_id: None })
    }

    /// Libera un candado: retira al portador del registro KV y marca la
    /// sombra inactiva. `NotFound` si el candado no existe o ya cerró.
    #[instrument(skip(self))]
    pub async fn release(&self, lock_id: Uuid) -> Result<(), LockFault> {
        let shadow = self
            .lock_repository
            .find_shadow(lock_id)
            .await
            .map_err(|fault| LockFault::Backend(fault.to_string()))?
            .ok_or(LockFault::NotFound)?;

        if !shadow.is_active {
            return Err(LockFault::NotFound);
        }

        self.evict_holder(shadow.twin_id, lock_id).await?;

        self.lock_repository
            .mark_inactive(lock_id)
            .await
            .map_err(|fault| LockFault::Backend(fault.to_string()))?;

        info!("🔓 [LOCK_MANAGER]: Lock {} released on twin {}.", lock_id, shadow.twin_id);
        Ok(())
    }

    /// Renueva el arrendamiento: sella `heartbeat_at` en SQL y extiende el
    /// TTL del KV por el TTL original completo. `Expired` si el KV ya lapsó.
    #[instrument(skip(self))]
    pub async fn heartbeat(&self, lock_id: Uuid) -> Result<(), LockFault> {
        let shadow = self
            .lock_repository
            .find_shadow(lock_id)
            .await
            .map_err(|fault| LockFault::Backend(fault.to_string()))?
            .ok_or(LockFault::NotFound)?;

        if !shadow.is_active {
            return Err(LockFault::NotFound);
        }

        let record_key = twin_lock_key(shadow.twin_id);
        let ttl = Duration::from_secs(self.lock_ttl_seconds.max(1) as u64);

        for _ in 0..self.cas_retry_limit {
            let now = Utc::now();
            let witnessed = self
                .kv
                .fetch(&record_key)
                .await
                .map_err(|fault| LockFault::Backend(fault.to_string()))?;

            // Arrendamiento KV lapso: el llamador debe re-adquirir.
            let Some(raw) = witnessed.as_deref() else {
                return Err(LockFault::Expired);
            };

            let mut record = parse_record(raw)?;
            record.prune_expired(now);
            if record.find_holder(lock_id).is_none() {
                return Err(LockFault::Expired);
            }

            let new_expiry = now + ChronoDuration::seconds(self.lock_ttl_seconds);
            for holder in record
                .exclusive_holders
                .iter_mut()
                .chain(record.shared_holders.iter_mut())
                .filter(|holder| holder.lock_id == lock_id)
            {
                holder.expires_at = new_expiry;
            }

            let payload = encode_record(&record)?;
            let installed = self
                .kv
                .install(&record_key, Some(raw), &payload, ttl)
                .await
                .map_err(|fault| LockFault::Backend(fault.to_string()))?;

            if installed {
                self.lock_repository
                    .touch_heartbeat(lock_id, now, new_expiry)
                    .await
                    .map_err(|fault| LockFault::Backend(fault.to_string()))?;
                return Ok(());
            }
        }

        Err(LockFault::Backend("CAS_RETRIES_EXHAUSTED".into()))
    }

    /// Busca un portador vivo de la sesión cuyo conjunto cubra la ruta.
    /// Autoridad: el registro del KV, nunca la sombra SQL.
    pub async fn covering_holder(
        &self,
        twin_id: Uuid,
        session_id: Uuid,
        component_path: &str,
    ) -> Result<Option<LockHolder>, LockFault> {
        let raw = self
            .kv
            .fetch(&twin_lock_key(twin_id))
            .await
            .map_err(|fault| LockFault::Backend(fault.to_string()))?;

        let Some(raw) = raw else { return Ok(None) };
        let mut record = parse_record(&raw)?;
        record.prune_expired(Utc::now());

        Ok(record.holder_covering(session_id, component_path).cloned())
    }

    /// Libera todos los candados activos de una sesión (logout/expiración).
    #[instrument(skip(self))]
    pub async fn release_session(&self, session_id: Uuid) -> usize {
        let session_locks = match self.lock_repository.active_for_session(session_id).await {
            Ok(locks) => locks,
            Err(fault) => {
                warn!("⚠️ [LOCK_MANAGER]: Session sweep query failed: {}", fault);
                return 0;
            }
        };

        let mut released = 0usize;
        for lock in session_locks {
            match self.release(lock.lock_id).await {
                Ok(()) => released += 1,
                Err(LockFault::NotFound) => {}
                Err(fault) => warn!("⚠️ [LOCK_MANAGER]: Session sweep release failed: {}", fault),
            }
        }
        released
    }

    /// Retira un portador del registro KV con disciplina CAS; elimina el
    /// key cuando el registro queda vacío. Usado por release y el reaper.
    pub(crate) async fn evict_holder(&self, twin_id: Uuid, lock_id: Uuid) -> Result<(), LockFault> {
        let record_key = twin_lock_key(twin_id);
        let ttl = Duration::from_secs(self.lock_ttl_seconds.max(1) as u64);

        for _ in 0..self.cas_retry_limit {
            let witnessed = self
                .kv
                .fetch(&record_key)
                .await
                .map_err(|fault| LockFault::Backend(fault.to_string()))?;

            let Some(raw) = witnessed.as_deref() else {
                // El TTL ya reconcilió el registro.
                return Ok(());
            };

            let mut record = parse_record(raw)?;
            let removed = record.remove_holder(lock_id);
            record.prune_expired(Utc::now());

            if record.is_empty() {
                self.kv
                    .remove(&record_key)
                    .await
                    .map_err(|fault| LockFault::Backend(fault.to_string()))?;
                return Ok(());
            }

            if !removed {
                return Ok(());
            }

            let payload = encode_record(&record)?;
            let installed = self
                .kv
                .install(&record_key, Some(raw), &payload, ttl)
                .await
                .map_err(|fault| LockFault::Backend(fault.to_string()))?;

            if installed {
                return Ok(());
            }
        }

        Err(LockFault::Backend("CAS_RETRIES_EXHAUSTED".into()))
    }
}

fn parse_record(raw: &str) -> Result<TwinLockRecord, LockFault> {
    serde_json::from_str(raw)
        .map_err(|fault| LockFault::Backend(format!("RECORD_DRIFT: {}", fault)))
}

fn encode_record(record: &TwinLockRecord) -> Result<String, LockFault> {
    serde_json::to_string(record)
        .map_err(|fault| LockFault::Backend(format!("RECORD_ENCODE_FAULT: {}", fault)))
}
