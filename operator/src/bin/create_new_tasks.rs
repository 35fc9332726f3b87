use crowdfunding_operator::{
    bootstrap, chain::TaskService, contract::ServiceManagerContract, generator::start_creating_tasks, init_logger,
    TASK_INTERVAL,
};
use log::{error, info};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();
    let (config, client) = match bootstrap().await {
        Ok(setup) => setup,
        Err(e) => {
            error!("setup failed: {}", e);
            return Err(e.into());
        }
    };

    let avs = config.avs_deployment()?;
    let service = Arc::new(ServiceManagerContract::load(client, &config, &avs)?);
    info!(
        "creating a task every {}s on service manager {:?}",
        TASK_INTERVAL.as_secs(),
        service.address()
    );

    start_creating_tasks(service, TASK_INTERVAL).await;
    Ok(())
}
