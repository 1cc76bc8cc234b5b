// [libs/infra/db/src/schema.rs]
/*!
 * =================================================================
 * APARATO: SCHEMA BOOTSTRAP (V4.1)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: MATERIALIZACIÓN IDEMPOTENTE DEL ESQUEMA SOBERANO
 *
 * Todas las marcas temporales se almacenan como RFC3339 UTC con offset
 * "+00:00" y microsegundos fijos: el orden lexicográfico del TEXT
 * coincide con el orden cronológico y habilita comparaciones en SQL.
 * =================================================================
 */

use crate::errors::DbError;
use libsql::Connection;
use tracing::info;

const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        user_id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        username TEXT NOT NULL UNIQUE,
        password_digest TEXT NOT NULL,
        organization_id TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        last_login_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS user_sessions (
        session_id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(user_id),
        expires_at TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS digital_twins (
        twin_id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        twin_type TEXT NOT NULL,
        owner_user_id TEXT NOT NULL REFERENCES users(user_id),
        version_number INTEGER NOT NULL DEFAULT 1,
        tags TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS twin_versions (
        version_id TEXT PRIMARY KEY,
        twin_id TEXT NOT NULL REFERENCES digital_twins(twin_id),
        version_number INTEGER NOT NULL,
        created_by TEXT NOT NULL,
        commit_message TEXT NOT NULL,
        model_url TEXT,
        model_format TEXT,
        properties TEXT NOT NULL,
        is_latest INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS edit_locks (
        lock_id TEXT PRIMARY KEY,
        twin_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        session_id TEXT NOT NULL,
        components TEXT NOT NULL,
        lock_type TEXT NOT NULL,
        acquired_at TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        heartbeat_at TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE TABLE IF NOT EXISTS edit_operations (
        op_seq INTEGER PRIMARY KEY AUTOINCREMENT,
        op_id TEXT NOT NULL UNIQUE,
        twin_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        op_type TEXT NOT NULL,
        component_path TEXT NOT NULL,
        data TEXT NOT NULL,
        vector_clock TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    // Serie temporal: el despliegue de producción la particiona por tiempo.
    "CREATE TABLE IF NOT EXISTS telemetry_data (
        time TEXT NOT NULL,
        node_id TEXT NOT NULL,
        rpm REAL,
        torque REAL,
        vibration_x REAL,
        vibration_y REAL,
        vibration_z REAL,
        temperature REAL,
        power REAL,
        tool_wear REAL,
        error_code INTEGER,
        custom_metrics TEXT
    )",
    "CREATE TABLE IF NOT EXISTS maintenance_tickets (
        ticket_id TEXT PRIMARY KEY,
        node_id TEXT NOT NULL,
        severity TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        diagnostic_data TEXT,
        status TEXT NOT NULL DEFAULT 'open',
        created_at TEXT NOT NULL,
        acknowledged_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS machine_nodes (
        node_id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        is_online INTEGER NOT NULL DEFAULT 1,
        last_maintenance_at TEXT,
        last_seen_at TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_sessions_user ON user_sessions(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_versions_twin ON twin_versions(twin_id, version_number)",
    "CREATE INDEX IF NOT EXISTS idx_locks_twin_active ON edit_locks(twin_id, is_active)",
    "CREATE INDEX IF NOT EXISTS idx_ops_twin_seq ON edit_operations(twin_id, op_seq)",
    "CREATE INDEX IF NOT EXISTS idx_telemetry_node_time ON telemetry_data(node_id, time)",
    "CREATE INDEX IF NOT EXISTS idx_tickets_dedup ON maintenance_tickets(node_id, title, created_at)",
];

/// Aplica el esquema completo. Idempotente: seguro en cada ignición.
pub async fn apply_full_schema(connection: &Connection) -> Result<(), DbError> {
    for statement in SCHEMA_STATEMENTS {
        connection.execute(statement, ()).await?;
    }
    info!("🧬 [SCHEMA]: Sovereign schema materialized ({} statements).", SCHEMA_STATEMENTS.len());
    Ok(())
}
