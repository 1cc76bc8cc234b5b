// [apps/maintenance-agent/src/main.rs]
/*!
 * =================================================================
 * APARATO: MAINTENANCE AGENT ENTRY POINT (V4.1)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L4)
 * RESPONSABILIDAD: BOOTSTRAP, IGNICIÓN DE BUCLES Y APAGADO LIMPIO
 *
 * El agente sale con código 0 en el apagado limpio (ctrl-c); cualquier
 * otro código delata una falla no capturada.
 * =================================================================
 */

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use twinforge_infra_db::DbClient;
use twinforge_maintenance_agent::agent::{AgentConfig, AgentState};
use twinforge_maintenance_agent::alert::TracingAlertChannel;
use twinforge_maintenance_agent::loops::{ignite_all_loops, retrain};
use twinforge_shared_argus::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "twinforge-maintenance-agent", about = "Fleet maintenance agent")]
struct AgentCli {
    #[arg(long, env = "DATABASE_URL", default_value = "file:twinforge.db")]
    database_url: String,

    #[arg(long, env = "DATABASE_AUTH_TOKEN")]
    database_auth_token: Option<String>,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 20)]
    db_max_connections: usize,

    #[arg(long, env = "MONITOR_INTERVAL_SECONDS", default_value_t = 60)]
    monitor_interval_seconds: u64,

    #[arg(long, env = "PREDICTIVE_INTERVAL_SECONDS", default_value_t = 3600)]
    predictive_interval_seconds: u64,

    #[arg(long, env = "OPTIMIZER_INTERVAL_SECONDS", default_value_t = 3600)]
    optimizer_interval_seconds: u64,

    #[arg(long, env = "ALERT_INTERVAL_SECONDS", default_value_t = 300)]
    alert_interval_seconds: u64,

    #[arg(long, env = "RETRAIN_INTERVAL_SECONDS", default_value_t = 86_400)]
    retrain_interval_seconds: u64,

    #[arg(long, env = "NODE_OFFLINE_AFTER_SECONDS", default_value_t = 600)]
    node_offline_after_seconds: i64,

    /// Omite el entrenamiento inicial de modelos en el arranque.
    #[arg(long, default_value_t = false)]
    skip_boot_retrain: bool,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("twinforge_maintenance_agent");

    let cli = AgentCli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(async {
        info!("🛰️  [AGENT]: Fleet maintenance agent ignition...");

        let database_client = match DbClient::connect(
            &cli.database_url,
            cli.database_auth_token.clone(),
            cli.db_max_connections,
        )
        .await
        {
            Ok(client) => client,
            Err(ignition_fault) => {
                error!("❌ [IGNITION_FAILED]: Database link collapsed: {}", ignition_fault);
                std::process::exit(1);
            }
        };

        let config = AgentConfig {
            monitor_interval_seconds: cli.monitor_interval_seconds,
            predictive_interval_seconds: cli.predictive_interval_seconds,
            optimizer_interval_seconds: cli.optimizer_interval_seconds,
            alert_interval_seconds: cli.alert_interval_seconds,
            retrain_interval_seconds: cli.retrain_interval_seconds,
            node_offline_after_seconds: cli.node_offline_after_seconds,
            ..AgentConfig::default()
        };

        let state = AgentState::new(database_client, Arc::new(TracingAlertChannel), config);

        // Entrenamiento inicial: los ticks del monitor necesitan modelos vivos.
        if !cli.skip_boot_retrain {
            if let Err(retrain_fault) = retrain::run_retrain_cycle(&state).await {
                error!("⚠️ [AGENT]: Boot retrain failed, monitor starts cold: {}", retrain_fault);
            }
        }

        ignite_all_loops(state);

        // Apagado limpio por señal del operador.
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("👋 [AGENT]: Shutdown signal received, exiting clean."),
            Err(signal_fault) => error!("⚠️ [AGENT]: Signal listener failed: {}", signal_fault),
        }

        Ok(())
    })
}
