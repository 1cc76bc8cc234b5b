// [apps/orchestrator/src/config.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR CONFIGURATION (V4.1)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L4)
 * RESPONSABILIDAD: CAPTURA DE ENTORNO Y PERILLAS OPERATIVAS
 * =================================================================
 */

use std::str::FromStr;

/// Perillas operativas del orquestador, hidratadas del entorno del proceso.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub database_connection_url: String,
    pub database_access_token: Option<String>,
    /// URL del estrato KV; el esquema `memory://` selecciona el backend en proceso.
    pub kv_connection_url: String,
    pub listening_network_port: u16,
    pub db_max_connections: usize,
    /// TTL por defecto de un candado de edición (segundos).
    pub lock_ttl_seconds: i64,
    /// Gracia del reaper sobre el último latido de candado (segundos).
    pub lock_heartbeat_grace_seconds: i64,
    /// Cadencia del barrido del reaper de candados (segundos).
    pub lock_reaper_interval_seconds: u64,
    /// Reintentos máximos del compare-and-set de adquisición.
    pub lock_cas_retry_limit: usize,
    /// Cadencia del ping del monitor de latidos WebSocket (segundos).
    pub ws_heartbeat_interval_seconds: u64,
    /// Ventana de vida de una sesión autenticada (segundos).
    pub session_ttl_seconds: i64,
    /// Política de autenticación de la ingesta de telemetría.
    pub telemetry_open_ingest: bool,
}

impl OrchestratorConfig {
    /// Hidrata la configuración desde variables de entorno con defaults
    /// de producción. Solo DATABASE_URL es obligatoria.
    pub fn from_env() -> Self {
        Self {
            database_connection_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "file:twinforge.db".to_string()),
            database_access_token: std::env::var("DATABASE_AUTH_TOKEN").ok(),
            kv_connection_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            listening_network_port: read_env_or("PORT", 3000),
            db_max_connections: read_env_or("DB_MAX_CONNECTIONS", 20),
            lock_ttl_seconds: read_env_or("LOCK_TTL_SECONDS", 300),
            lock_heartbeat_grace_seconds: read_env_or("LOCK_HEARTBEAT_GRACE_SECONDS", 30),
            lock_reaper_interval_seconds: read_env_or("LOCK_REAPER_INTERVAL_SECONDS", 30),
            lock_cas_retry_limit: read_env_or("LOCK_CAS_RETRY_LIMIT", 5),
            ws_heartbeat_interval_seconds: read_env_or("WS_HEARTBEAT_INTERVAL_SECONDS", 15),
            session_ttl_seconds: read_env_or("SESSION_TTL_SECONDS", 86_400),
            telemetry_open_ingest: read_env_or("TELEMETRY_OPEN_INGEST", false),
        }
    }
}

fn read_env_or<T: FromStr>(variable_name: &str, default_value: T) -> T {
    std::env::var(variable_name)
        .ok()
        .and_then(|raw| raw.parse::<T>().ok())
        .unwrap_or(default_value)
}
