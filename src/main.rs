use drops_core::{EnvironmentLink, FileFetchClient, UpdateEvent, load_settings};
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{self, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let settings = load_settings()?;
    let link = EnvironmentLink::new(
        FileFetchClient::new(&settings.payload_path),
        settings.link_options()?,
        Handle::current(),
    );

    if let Some(path) = &settings.constants_path {
        match link.import_config(path) {
            Ok(errors) if errors.is_empty() => info!("Loaded planner constants from {}", path.display()),
            Ok(errors) => warn!("Loaded planner constants from {} with {} bad line(s)", path.display(), errors.len()),
            Err(e) => warn!("Could not read planner constants from {}: {}. Using defaults.", path.display(), e),
        }
    }

    info!(
        "DROPS environment link started. Polling {} every {:?}",
        settings.payload_path.display(),
        settings.poll_interval()
    );

    let mut events = link.subscribe();
    let mut ticker = tokio::time::interval(settings.poll_interval());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !link.trigger_update() {
                    debug!("Previous cycle still running, skipping this tick.");
                }
            }
            event = events.recv() => match event {
                Ok(event) => match &*event {
                    UpdateEvent::Published { mode, width, height, changed_cells } => {
                        info!("Published {} cycle: {}x{} grid, {} moving-obstacle cell(s)", mode, width, height, changed_cells);
                        let env = link.get_env_data();
                        debug!("Robot at ({}, {}) heading {}, goal ({}, {})", env.start_x, env.start_y, env.start_theta, env.end_x, env.end_y);
                    }
                    UpdateEvent::Failed { kind, message } => {
                        warn!("Cycle failed ({}): {}. Retrying next tick.", kind, message);
                    }
                },
                Err(RecvError::Lagged(skipped)) => warn!("Event listener lagged, {} event(s) skipped.", skipped),
                Err(RecvError::Closed) => {
                    error!("Event topic closed. Stopping.");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested.");
                break;
            }
        }
    }

    Ok(())
}
