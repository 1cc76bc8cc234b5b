// [libs/domain/models/src/lock.rs]
/*!
 * =================================================================
 * APARATO: EDIT LOCK CONTRACTS (V4.1)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CANDADOS DE COMPONENTE Y REGISTRO AGREGADO EN EL KV
 *
 * # Mathematical Proof (Conflict Detection):
 * El registro agregado por gemelo permite que un único compare-and-set
 * atómico detecte el conflicto e instale el candado en la misma operación.
 * Invariante: ningún par de candados exclusivos activos comparte
 * componentes; un candado compartido jamás se solapa con uno exclusivo.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Disciplina de acceso de un candado de edición.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockType {
    /// Escritor único: rechaza cualquier solapamiento de componentes.
    Exclusive,
    /// Lector concurrente: coexiste con otros compartidos, nunca con exclusivos.
    Shared,
}

/// Fila sombra durable en SQL (`edit_locks`): auditoría y sustrato del reaper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditLock {
    pub lock_id: Uuid,
    pub twin_id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub components: BTreeSet<String>,
    pub lock_type: LockType,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub heartbeat_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Portador individual dentro del registro agregado del KV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockHolder {
    pub lock_id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    /// Rutas punteadas del árbol de propiedades ("chassis.bolt1").
    pub components: BTreeSet<String>,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LockHolder {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Evalúa si algún componente de este portador se solapa con el conjunto
    /// solicitado. Dos rutas se solapan cuando una es igual a la otra o
    /// prefijo punteado de la otra ("chassis" cubre "chassis.bolt1").
    pub fn overlaps(&self, requested_components: &BTreeSet<String>) -> bool {
        self.components.iter().any(|held| {
            requested_components
                .iter()
                .any(|requested| paths_overlap(held, requested))
        })
    }

    /// Evalúa si el conjunto de componentes del portador cubre la ruta dada.
    pub fn covers(&self, component_path: &str) -> bool {
        self.components
            .iter()
            .any(|held| held == component_path || is_dotted_prefix(held, component_path))
    }
}

/// Registro agregado por gemelo, valor del key `lock:twin:<uuid>`.
/// Los candados exclusivos con componentes disjuntos coexisten en la lista.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TwinLockRecord {
    pub exclusive_holders: Vec<LockHolder>,
    pub shared_holders: Vec<LockHolder>,
}

impl TwinLockRecord {
    pub fn is_empty(&self) -> bool {
        self.exclusive_holders.is_empty() && self.shared_holders.is_empty()
    }

    /// Elimina los portadores cuyo `expires_at` ya lapsó; retorna cuántos cayeron.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> usize {
        let population_before = self.exclusive_holders.len() + self.shared_holders.len();
        self.exclusive_holders.retain(|holder| !holder.is_expired(now));
        self.shared_holders.retain(|holder| !holder.is_expired(now));
        population_before - (self.exclusive_holders.len() + self.shared_holders.len())
    }

    /// Localiza al primer portador que entra en conflicto con la petición.
    ///
    /// Reglas:
    /// - Exclusivo solicitado: conflicto con CUALQUIER portador solapado.
    /// - Compartido solicitado: conflicto solo con exclusivos solapados.
    pub fn find_conflict(
        &self,
        requested_components: &BTreeSet<String>,
        requested_type: LockType,
    ) -> Option<&LockHolder> {
        let exclusive_clash = self
            .exclusive_holders
            .iter()
            .find(|holder| holder.overlaps(requested_components));

        match requested_type {
            LockType::Exclusive => exclusive_clash.or_else(|| {
                self.shared_holders
                    .iter()
                    .find(|holder| holder.overlaps(requested_components))
            }),
            LockType::Shared => exclusive_clash,
        }
    }

    /// Localiza un portador activo por identificador de candado.
    pub fn find_holder(&self, lock_id: Uuid) -> Option<(&LockHolder, LockType)> {
        self.exclusive_holders
            .iter()
            .find(|holder| holder.lock_id == lock_id)
            .map(|holder| (holder, LockType::Exclusive))
            .or_else(|| {
                self.shared_holders
                    .iter()
                    .find(|holder| holder.lock_id == lock_id)
                    .map(|holder| (holder, LockType::Shared))
            })
    }

    /// Retira un portador por identificador; retorna si existía.
    pub fn remove_holder(&mut self, lock_id: Uuid) -> bool {
        let population_before = self.exclusive_holders.len() + self.shared_holders.len();
        self.exclusive_holders.retain(|holder| holder.lock_id != lock_id);
        self.shared_holders.retain(|holder| holder.lock_id != lock_id);
        population_before != self.exclusive_holders.len() + self.shared_holders.len()
    }

    /// Busca, entre los portadores de la sesión dada, uno que cubra la ruta.
    pub fn holder_covering(&self, session_id: Uuid, component_path: &str) -> Option<&LockHolder> {
        self.exclusive_holders
            .iter()
            .chain(self.shared_holders.iter())
            .find(|holder| holder.session_id == session_id && holder.covers(component_path))
    }
}

/// Nombre del key KV del registro agregado de un gemelo.
pub fn twin_lock_key(twin_id: Uuid) -> String {
    format!("lock:twin:{}", twin_id)
}

fn paths_overlap(left: &str, right: &str) -> bool {
    left == right || is_dotted_prefix(left, right) || is_dotted_prefix(right, left)
}

fn is_dotted_prefix(prefix: &str, path: &str) -> bool {
    path.len() > prefix.len() && path.starts_with(prefix) && path.as_bytes()[prefix.len()] == b'.'
}

// --- PAYLOADS DE LA SUPERFICIE HTTP ---

#[derive(Debug, Clone, Deserialize)]
pub struct AcquireLockPayload {
    pub twin_id: Uuid,
    pub components: Vec<String>,
    pub lock_type: LockType,
}
