use anyhow::Result;
use simulation_gateway::{api, config, telemetry};
use config::Config;
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;

    let sim = &cfg.simulation;
    if !sim.working_dir.is_dir() {
        anyhow::bail!(
            "simulation.working_dir {} does not exist or is not a directory",
            sim.working_dir.display()
        );
    }
    if !sim.serialize_runs {
        warn!(
            result_file = %sim.result_path().display(),
            "Concurrent simulations share one result file; \
            set simulation.serialize_runs to avoid mixed results"
        );
    }

    let app_state = api::AppState::new(&cfg);
    let app = api::router(app_state, &cfg);

    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" {
        warn!(
            "Server binding to 0.0.0.0 - uploads are accepted from the network \
            without authentication. Bind to 127.0.0.1 unless behind a reverse proxy."
        );
    }

    info!(
        %addr,
        endpoint = %cfg.server.endpoint_path,
        program = %sim.program,
        working_dir = %sim.working_dir.display(),
        "starting simulation gateway"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
