// [apps/orchestrator/src/main.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR ENTRY POINT (V4.0)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L4)
 * RESPONSABILIDAD: BOOTSTRAP DE ENTORNO E IGNICIÓN SEGURA
 * =================================================================
 */

use dotenvy::dotenv;
use tracing::{error, info};
use twinforge_orchestrator::prelude::*;
use twinforge_shared_argus::init_tracing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. CARGA DE ENTORNO
    dotenv().ok();

    // 2. OBSERVABILIDAD
    init_tracing("twinforge_orchestrator");

    // 3. RUNTIME MULTI-HILO
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(async {
        info!("🛰️  [ORCHESTRATOR]: Ignition sequence starting...");

        let config = OrchestratorConfig::from_env();

        let kernel = match OrchestratorKernel::ignite(config).await {
            Ok(kernel) => kernel,
            Err(ignition_fault) => {
                error!("❌ [IGNITION_FAILED]: Infrastructure link collapsed: {}", ignition_fault);
                std::process::exit(1);
            }
        };

        kernel.launch().await;
        Ok(())
    })
}
