use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voice_demo::ui::SessionFactory;
use voice_demo::{DemoConfig, SessionController, SimulatedTransport};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_demo=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting voice agent demo");

    let config = DemoConfig::load_from_env().unwrap_or_else(|e| {
        error!("Failed to load configuration, using defaults: {}", e);
        DemoConfig::default()
    });
    info!(
        "Agent endpoint {}, bot ready timeout {:?}",
        config.agent_url,
        config.bot_ready_timeout()
    );

    let factory_config = config.clone();
    let factory: SessionFactory = Box::new(move || {
        let transport = SimulatedTransport::new(factory_config.simulation.clone())
            .with_endpoint(factory_config.agent_url.clone());
        SessionController::new(transport, &factory_config).start_worker()
    });

    voice_demo::ui::run(config, factory).map_err(|e| anyhow::anyhow!("UI error: {}", e))?;

    Ok(())
}
