// [libs/infra/db/src/repositories/telemetry.rs]
/*!
 * =================================================================
 * APARATO: TELEMETRY REPOSITORY (V4.1)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: INGESTA SINGLE/BATCH Y VENTANAS DE CONSULTA
 *
 * La ráfaga batch es la fuente principal de escritura del sistema: se
 * materializa como un único INSERT multi-fila bajo una sola conexión de
 * la compuerta.
 * =================================================================
 */

use super::{parse_stamp, parse_uuid, to_stamp};
use crate::client::DbClient;
use crate::errors::DbError;
use chrono::{DateTime, Duration, Utc};
use libsql::{params, Value};
use tracing::{debug, instrument};
use twinforge_domain_models::telemetry::TelemetrySample;
use uuid::Uuid;

/// Columnas por fila del INSERT multi-fila.
const SAMPLE_COLUMN_COUNT: usize = 12;

pub struct TelemetryRepository {
    database_client: DbClient,
}

impl TelemetryRepository {
    pub fn new(client: DbClient) -> Self {
        Self { database_client: client }
    }

    #[instrument(skip(self, sample), fields(node = %sample.node_id))]
    pub async fn insert_sample(&self, sample: &TelemetrySample) -> Result<(), DbError> {
        let connection = self.database_client.acquire().await?;

        connection
            .execute(
                "INSERT INTO telemetry_data (time, node_id, rpm, torque, vibration_x,
                    vibration_y, vibration_z, temperature, power, tool_wear, error_code, custom_metrics)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                Self::bind_sample(sample)?,
            )
            .await?;
        Ok(())
    }

    /// Ingesta por ráfaga: un único INSERT multi-fila bajo una conexión.
    #[instrument(skip(self, samples), fields(count = samples.len()))]
    pub async fn insert_batch(&self, samples: &[TelemetrySample]) -> Result<usize, DbError> {
        if samples.is_empty() {
            return Ok(0);
        }

        let connection = self.database_client.acquire().await?;

        let placeholders: Vec<String> = (0..samples.len())
            .map(|row_index| {
                let base = row_index * SAMPLE_COLUMN_COUNT;
                let slots: Vec<String> =
                    (1..=SAMPLE_COLUMN_COUNT).map(|offset| format!("?{}", base + offset)).collect();
                format!("({})", slots.join(", "))
            })
            .collect();

        let statement = format!(
            "INSERT INTO telemetry_data (time, node_id, rpm, torque, vibration_x,
                vibration_y, vibration_z, temperature, power, tool_wear, error_code, custom_metrics)
             VALUES {}",
            placeholders.join(", ")
        );

        let mut bound_values: Vec<Value> = Vec::with_capacity(samples.len() * SAMPLE_COLUMN_COUNT);
        for sample in samples {
            bound_values.extend(Self::bind_sample(sample)?);
        }

        connection.execute(&statement, bound_values).await?;
        debug!("📥 [TELEMETRY_REPO]: Burst of {} samples crystallized.", samples.len());
        Ok(samples.len())
    }

    /// Ventana de evaluación: muestras de los últimos `window` (máx `limit`),
    /// más recientes primero.
    #[instrument(skip(self))]
    pub async fn recent_window(
        &self,
        node_id: Uuid,
        window: Duration,
        limit: i64,
    ) -> Result<Vec<TelemetrySample>, DbError> {
        let connection = self.database_client.acquire().await?;
        let window_floor = to_stamp(Utc::now() - window);

        let mut rows = connection
            .query(
                "SELECT time, node_id, rpm, torque, vibration_x, vibration_y, vibration_z,
                        temperature, power, tool_wear, error_code, custom_metrics
                 FROM telemetry_data
                 WHERE node_id = ?1 AND time >= ?2
                 ORDER BY time DESC LIMIT ?3",
                params![node_id.to_string(), window_floor, limit.max(0)],
            )
            .await?;

        Self::collect_samples(&mut rows).await
    }

    /// Serie ascendente desde el umbral dado; `clean_only` descarta muestras
    /// con código de error (sustrato de entrenamiento del detector).
    #[instrument(skip(self))]
    pub async fn window_since(
        &self,
        node_id: Uuid,
        since: DateTime<Utc>,
        clean_only: bool,
    ) -> Result<Vec<TelemetrySample>, DbError> {
        let connection = self.database_client.acquire().await?;

        let statement = if clean_only {
            "SELECT time, node_id, rpm, torque, vibration_x, vibration_y, vibration_z,
                    temperature, power, tool_wear, error_code, custom_metrics
             FROM telemetry_data
             WHERE node_id = ?1 AND time >= ?2
               AND (error_code IS NULL OR error_code = 0)
             ORDER BY time ASC"
        } else {
            "SELECT time, node_id, rpm, torque, vibration_x, vibration_y, vibration_z,
                    temperature, power, tool_wear, error_code, custom_metrics
             FROM telemetry_data
             WHERE node_id = ?1 AND time >= ?2
             ORDER BY time ASC"
        };

        let mut rows = connection
            .query(statement, params![node_id.to_string(), to_stamp(since)])
            .await?;

        Self::collect_samples(&mut rows).await
    }

    /// Última muestra conocida del nodo.
    pub async fn latest_sample(&self, node_id: Uuid) -> Result<Option<TelemetrySample>, DbError> {
        let connection = self.database_client.acquire().await?;
        let mut rows = connection
            .query(
                "SELECT time, node_id, rpm, torque, vibration_x, vibration_y, vibration_z,
                        temperature, power, tool_wear, error_code, custom_metrics
                 FROM telemetry_data WHERE node_id = ?1 ORDER BY time DESC LIMIT 1",
                params![node_id.to_string()],
            )
            .await?;

        match rows.next().await? {
            None => Ok(None),
            Some(row) => Ok(Some(Self::map_sample_row(&row)?)),
        }
    }

    async fn collect_samples(rows: &mut libsql::Rows) -> Result<Vec<TelemetrySample>, DbError> {
        let mut samples = Vec::new();
        while let Some(row) = rows.next().await? {
            samples.push(Self::map_sample_row(&row)?);
        }
        Ok(samples)
    }

    fn map_sample_row(row: &libsql::Row) -> Result<TelemetrySample, DbError> {
        let custom_metrics = row
            .get::<Option<String>>(11)?
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(|fault| DbError::MappingError(fault.to_string()))?;

        Ok(TelemetrySample {
            time: parse_stamp(&row.get::<String>(0)?)?,
            node_id: parse_uuid(&row.get::<String>(1)?)?,
            rpm: row.get(2)?,
            torque: row.get(3)?,
            vibration_x: row.get(4)?,
            vibration_y: row.get(5)?,
            vibration_z: row.get(6)?,
            temperature: row.get(7)?,
            power: row.get(8)?,
            tool_wear: row.get(9)?,
            error_code: row.get(10)?,
            custom_metrics,
        })
    }

    fn encode_custom_metrics(sample: &TelemetrySample) -> Result<Option<String>, DbError> {
        sample
            .custom_metrics
            .as_ref()
            .map(|metrics| serde_json::to_string(metrics))
            .transpose()
            .map_err(|fault| DbError::MappingError(fault.to_string()))
    }

    /// Vector de binding posicional de una muestra (una fila del INSERT).
    fn bind_sample(sample: &TelemetrySample) -> Result<Vec<Value>, DbError> {
        Ok(vec![
            Value::from(to_stamp(sample.time)),
            Value::from(sample.node_id.to_string()),
            optional_real(sample.rpm),
            optional_real(sample.torque),
            optional_real(sample.vibration_x),
            optional_real(sample.vibration_y),
            optional_real(sample.vibration_z),
            optional_real(sample.temperature),
            optional_real(sample.power),
            optional_real(sample.tool_wear),
            optional_integer(sample.error_code),
            match Self::encode_custom_metrics(sample)? {
                Some(json) => Value::from(json),
                None => Value::Null,
            },
        ])
    }
}

fn optional_real(value: Option<f64>) -> Value {
    match value {
        Some(real) => Value::from(real),
        None => Value::Null,
    }
}

fn optional_integer(value: Option<i64>) -> Value {
    match value {
        Some(integer) => Value::from(integer),
        None => Value::Null,
    }
}
