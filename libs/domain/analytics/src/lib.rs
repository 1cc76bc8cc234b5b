// [libs/domain/analytics/src/lib.rs]
/*!
 * =================================================================
 * APARATO: MAINTENANCE INFERENCE CORTEX (V4.0)
 * CLASIFICACIÓN: DOMAIN INFERENCE (ESTRATO L2)
 * RESPONSABILIDAD: MATEMÁTICA PURA DE SALUD, PRONÓSTICO Y POLÍTICA
 *
 * Esta crate no toca I/O: recibe ventanas de telemetría ya hidratadas y
 * devuelve veredictos deterministas. Los daemons del agente son quienes
 * consultan la persistencia y aplican los veredictos.
 * =================================================================
 */

pub mod failure;
pub mod health;
pub mod isolation;
pub mod recommend;

/// Umbral crítico de vibración de husillo (fuerza g).
pub const VIB_CRIT: f64 = 0.8;

/// Umbral crítico de temperatura de cabezal (grados Celsius).
pub const TEMP_CRIT: f64 = 95.0;

/// Umbral de desgaste de herramienta que dispara reemplazo (porcentaje).
pub const TOOL_WEAR_CRIT: f64 = 80.0;

/// Valor centinela de días sin mantenimiento cuando la fecha es desconocida.
pub const DAYS_SINCE_MAINTENANCE_UNKNOWN: i64 = 9999;
