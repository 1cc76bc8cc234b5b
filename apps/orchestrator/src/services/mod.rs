// [apps/orchestrator/src/services/mod.rs]
/*!
 * =================================================================
 * APARATO: SERVICES REGISTRY (V4.0)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: REGISTRO DE SERVICIOS Y DAEMONS DEL ORQUESTADOR
 * =================================================================
 */

pub mod edit_pipeline;
pub mod fanout_bridge;
pub mod heartbeat_monitor;
pub mod lock_manager;
pub mod lock_reaper;

pub use fanout_bridge::spawn_fanout_bridge;
pub use heartbeat_monitor::spawn_heartbeat_monitor;
pub use lock_manager::{LockFault, LockManager};
pub use lock_reaper::spawn_lock_reaper;
