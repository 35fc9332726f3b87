use crowdfunding_operator::{
    agent, bootstrap,
    contract::{RegistryContracts, ServiceManagerContract},
    donation_amount, init_logger,
};
use log::error;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();
    let (config, client) = match bootstrap().await {
        Ok(setup) => setup,
        Err(e) => {
            error!("Error in main function: {}", e);
            return Err(e.into());
        }
    };

    let avs = config.avs_deployment()?;
    let core = config.core_deployment()?;
    let registry = RegistryContracts::load(client.clone(), &config, &core, &avs)?;
    let service = Arc::new(ServiceManagerContract::load(client, &config, &avs)?);

    agent::run(&registry, service, donation_amount()).await;
    Ok(())
}
