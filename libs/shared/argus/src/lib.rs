// [libs/shared/argus/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ARGUS OBSERVER (V4.0)
 * CLASIFICACIÓN: SHARED UTILITY (ESTRATO L6)
 * RESPONSABILIDAD: GESTIÓN DE TELEMETRÍA, TRAZADO Y CAPTURA DE PÁNICOS
 *
 * # Mathematical Proof (Observability Integrity):
 * La arquitectura de registro garantiza que el rastro de ejecución se
 * preserve incluso ante una terminación abrupta del host: el hook de
 * pánico emite coordenadas y payload antes de la defunción del proceso.
 * =================================================================
 */

use std::panic;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as formatting_layer, EnvFilter};

/// Inicializa el sistema de trazas Argus con blindaje de pánicos.
///
/// # Comportamiento:
/// - Desarrollo: logs compactos con resaltado para el operador.
/// - Producción: estructura JSON plana para la ingesta centralizada.
///
/// # Errors:
/// Entra en pánico si otro suscriptor global ya fue inicializado en el runtime.
pub fn init_tracing(service_nominal_identifier: &str) {
    // 1. FILTRO DINÁMICO: priorizamos el dominio propio y silenciamos
    // el ruido de infraestructura (Tower, Hyper, libSQL).
    let environmental_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "{}={level},tower_http=warn,hyper=warn,libsql=error,redis=warn",
            service_nominal_identifier,
            level = if cfg!(debug_assertions) { "debug" } else { "info" }
        )
        .into()
    });

    let is_production_strata = !cfg!(debug_assertions);

    // 2. ARQUITECTURA DE SUSCRIPCIÓN (Dual Mode)
    if is_production_strata {
        tracing_subscriber::registry()
            .with(environmental_filter)
            .with(formatting_layer::layer().json().flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(environmental_filter)
            .with(formatting_layer::layer().compact().with_target(false))
            .init();
    }

    // 3. HOOK GLOBAL DE PÁNICO
    // Captura colapsos en hilos secundarios (daemons de mantenimiento)
    // y los envía al rastro antes de la terminación.
    let service_id_snapshot = service_nominal_identifier.to_string();

    panic::set_hook(Box::new(move |panic_metadata| {
        let panic_location = panic_metadata
            .location()
            .map(|location| format!("{}:{}:{}", location.file(), location.line(), location.column()))
            .unwrap_or_else(|| "UNKNOWN_COORDINATES".to_string());

        let panic_payload_message = panic_metadata
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_metadata.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("UNDEFINED_PANIC_PAYLOAD");

        error!(
            target: "panic_monitor",
            service = %service_id_snapshot,
            location = %panic_location,
            "🔥 [CRITICAL_PANIC]: Thread terminated abruptly. Analysis: {}",
            panic_payload_message
        );
    }));

    info!(
        "👁️  [ARGUS_ONLINE]: Observability strata active for [{}].",
        service_nominal_identifier
    );
}
