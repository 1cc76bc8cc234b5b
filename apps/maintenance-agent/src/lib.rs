// [apps/maintenance-agent/src/lib.rs]
/*!
 * =================================================================
 * APARATO: MAINTENANCE AGENT LIBRARY ROOT (V4.0)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L4)
 * RESPONSABILIDAD: REGISTRO DE MÓDULOS DEL AGENTE DE FLOTA
 * =================================================================
 */

pub mod agent;
pub mod alert;
pub mod loops;
