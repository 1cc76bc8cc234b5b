// [libs/domain/models/src/edit.rs]
/*!
 * =================================================================
 * APARATO: EDIT OPERATION CONTRACTS (V4.0)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: LOG APPEND-ONLY DE EDICIONES Y RELOJES VECTORIALES
 *
 * # Mathematical Proof (Causal Audit):
 * El servidor no fusiona ediciones: el orden total lo impone la secuencia
 * de inserción SQL y el reloj vectorial almacenado es una extensión lineal
 * del orden parcial causal, disponible para reconciliación en el cliente.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Reloj vectorial: contador monótono por operador.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorClock(pub BTreeMap<Uuid, u64>);

impl VectorClock {
    /// Fusión elemento a elemento (máximo por operador).
    pub fn merge_assign(&mut self, other: &VectorClock) {
        for (participant, counter) in &other.0 {
            let entry = self.0.entry(*participant).or_insert(0);
            if *counter > *entry {
                *entry = *counter;
            }
        }
    }

    /// Avanza el contador propio del operador dado.
    pub fn increment(&mut self, participant: Uuid) {
        *self.0.entry(participant).or_insert(0) += 1;
    }

    /// Orden parcial causal: self ≤ other componente a componente.
    pub fn happened_before_or_equal(&self, other: &VectorClock) -> bool {
        self.0
            .iter()
            .all(|(participant, counter)| other.0.get(participant).copied().unwrap_or(0) >= *counter)
    }
}

/// Entrada append-only del log de ediciones de un gemelo. Jamás se muta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditOperation {
    pub op_id: Uuid,
    /// Secuencia de inserción: autoridad del orden total dentro del gemelo.
    pub op_seq: i64,
    pub twin_id: Uuid,
    pub user_id: Uuid,
    pub op_type: String,
    pub component_path: String,
    /// Payload dinámico serializado verbatim a la columna JSON.
    pub data: Value,
    pub vector_clock: VectorClock,
    pub created_at: DateTime<Utc>,
}

// --- PAYLOADS DE LA SUPERFICIE HTTP ---

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitEditPayload {
    pub twin_id: Uuid,
    pub operation_type: String,
    pub component_path: String,
    pub operation_data: Value,
    #[serde(default)]
    pub vector_clock: Option<VectorClock>,
}
