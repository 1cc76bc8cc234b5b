// [apps/orchestrator/src/handlers/mod.rs]
/*!
 * =================================================================
 * APARATO: HANDLERS REGISTRY (V4.0)
 * CLASIFICACIÓN: API ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: REGISTRO DE ADAPTADORES HTTP Y DUPLEX
 * =================================================================
 */

pub mod auth;
pub mod edits;
pub mod health;
pub mod locks;
pub mod stream;
pub mod telemetry;
pub mod twins;
