use saasconsole_api::setup;
use saasconsole_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (_state, router, scheduler) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router).await?;

    scheduler.shutdown().await;
    saasconsole_infra::shutdown_telemetry().await;

    Ok(())
}
