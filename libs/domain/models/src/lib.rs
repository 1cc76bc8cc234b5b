// [libs/domain/models/src/lib.rs]
/*!
 * =================================================================
 * APARATO: DOMAIN CONTRACTS REGISTRY (V4.0)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: FUENTE ÚNICA DE VERDAD PARA ENTIDADES Y FRAMES
 * =================================================================
 */

pub mod edit;
pub mod frames;
pub mod identity;
pub mod lock;
pub mod telemetry;
pub mod ticket;
pub mod twin;
