//! Operator agent: one-time registration with the delegation manager and the
//! stake registry, then a donation for every task the service manager creates.

use crate::chain::{OperatorDetails, OperatorRegistry, SignatureWithSaltAndExpiry, TaskService};
use crate::error::{Error, Result};
use crate::utils::{format_ether, get_timestamp};
use crate::SIGNATURE_EXPIRY;
use futures::StreamExt;
use log::{error, info};
use std::sync::Arc;
use web3::types::{Address, U256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    AlreadyRegistered,
    Registered,
    /// `isOperator` or `registerAsOperator` failed; the signature step was skipped.
    CoreRegistrationFailed,
    ServiceRegistrationFailed,
}

pub async fn register_operator<R>(registry: &R, service_manager: Address) -> RegistrationOutcome
where
    R: OperatorRegistry + ?Sized,
{
    let operator = registry.operator();

    let core = async {
        if registry.is_operator(operator).await? {
            return Ok(true);
        }
        let details = OperatorDetails {
            earnings_receiver: operator,
            delegation_approver: Address::zero(),
            staker_opt_out_window_blocks: 0,
        };
        registry.register_as_operator(details, "").await?;
        Ok::<_, Error>(false)
    };
    match core.await {
        Ok(true) => {
            info!("Operator is already registered; skipping registration.");
            return RegistrationOutcome::AlreadyRegistered;
        }
        Ok(false) => info!("Operator registered to Core EigenLayer contracts"),
        Err(e) => {
            error!("Error in registering as operator: {}", e);
            return RegistrationOutcome::CoreRegistrationFailed;
        }
    }

    match register_with_signature(registry, operator, service_manager).await {
        Ok(()) => {
            info!("Operator registered on AVS successfully");
            RegistrationOutcome::Registered
        }
        Err(e) => {
            error!("Error in AVS registration: {}", e);
            RegistrationOutcome::ServiceRegistrationFailed
        }
    }
}

async fn register_with_signature<R>(registry: &R, operator: Address, service_manager: Address) -> Result<()>
where
    R: OperatorRegistry + ?Sized,
{
    let salt: [u8; 32] = rand::random();
    let expiry = U256::from(get_timestamp() + SIGNATURE_EXPIRY);

    let digest = registry
        .calculate_registration_digest(operator, service_manager, salt, expiry)
        .await?;

    info!("Signing digest hash with operator's private key");
    let signature = registry.sign_digest(digest)?;

    info!("Registering Operator to AVS Registry contract");
    let payload = SignatureWithSaltAndExpiry {
        signature,
        salt,
        expiry,
    };
    registry.register_operator_with_signature(payload, operator).await?;
    Ok(())
}

/// Never fails; the outcome is logged and reported as a flag.
pub async fn donate_to_task<S>(service: &S, task_index: U256, amount: U256) -> bool
where
    S: TaskService + ?Sized,
{
    info!("Donating {} ETH to task {}", format_ether(amount), task_index);
    match service.donate_to_task(task_index, amount).await {
        Ok(_) => {
            info!("Successfully donated to task {}", task_index);
            true
        }
        Err(e) => {
            error!("Error donating to task {}: {}", task_index, e);
            false
        }
    }
}

/// Donates `amount` to every task announced by the service manager. Returns
/// only when the subscription itself cannot be set up or ends.
pub async fn monitor_new_tasks<S>(service: Arc<S>, amount: U256) -> Result<()>
where
    S: TaskService + ?Sized + 'static,
{
    let mut events = service.new_task_events().await?;
    info!("Monitoring for new tasks...");

    while let Some(event) = events.next().await {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                error!("Error reading task event: {}", e);
                continue;
            }
        };
        info!("New task detected: {}", event.name);
        let service = service.clone();
        tokio::spawn(async move {
            donate_to_task(service.as_ref(), event.task_index, amount).await;
        });
    }
    Err(Error::SubscriptionClosed)
}

pub async fn run<R, S>(registry: &R, service: Arc<S>, amount: U256)
where
    R: OperatorRegistry + ?Sized,
    S: TaskService + ?Sized + 'static,
{
    register_operator(registry, service.address()).await;
    if let Err(e) = monitor_new_tasks(service, amount).await {
        error!("Error monitoring tasks: {}", e);
    }
}
