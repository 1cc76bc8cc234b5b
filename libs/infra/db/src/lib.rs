// [libs/infra/db/src/lib.rs]
/*!
 * =================================================================
 * APARATO: PERSISTENCE GATEWAY (V4.0)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: COMPUERTA DE CONEXIONES Y REPOSITORIOS TIPADOS
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use client::{DbClient, PooledConnection};
pub use errors::DbError;
