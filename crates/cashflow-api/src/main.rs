use cashflow_api::setup;
use cashflow_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Database, storage, services, background reaper, routes
    let (state, router) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router).await?;

    state.shutdown();
    Ok(())
}
