//! Task generator: submits a randomly parameterised `createNewTask` on a fixed timer.

use crate::chain::{TaskParams, TaskService, NEW_TASK_CREATED};
use crate::utils::{format_ether, parse_ether};
use log::{error, info};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use web3::types::{H256, U256};

pub const ADJECTIVES: [&str; 5] = ["Quick", "Lazy", "Sleepy", "Noisy", "Hungry"];
pub const NOUNS: [&str; 5] = ["Fox", "Dog", "Cat", "Mouse", "Bear"];

pub const SECONDS_PER_DAY: u64 = 86400;
pub const MAX_GOAL_ETHER: u64 = 100;
pub const MAX_DURATION_DAYS: u64 = 30;

/// What became of one `createNewTask` submission.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Created {
        transaction_hash: H256,
        task_index: U256,
        params: TaskParams,
    },
    /// Mined, but no `NewTaskCreated` among the receipt's events.
    EventMissing { transaction_hash: H256, events: Vec<String> },
    Failed(String),
}

/// `{Adjective}{Noun}{0-999}`
pub fn generate_random_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
    format!("{}{}{}", adjective, noun, rng.gen_range(0..1000))
}

/// Goal of 1..=100 whole ether (in wei) and a duration of 1..=30 days (in seconds).
pub fn generate_random_goal_and_duration<R: Rng + ?Sized>(rng: &mut R) -> (U256, u64) {
    let goal = parse_ether(rng.gen_range(1..=MAX_GOAL_ETHER));
    let duration = rng.gen_range(1..=MAX_DURATION_DAYS) * SECONDS_PER_DAY;
    (goal, duration)
}

pub async fn create_new_task<S>(service: &S, params: TaskParams) -> TaskOutcome
where
    S: TaskService + ?Sized,
{
    let receipt = match service.create_new_task(&params).await {
        Ok(receipt) => receipt,
        Err(e) => {
            error!("Error sending transaction: {}", e);
            return TaskOutcome::Failed(e.to_string());
        }
    };

    match receipt
        .find_event(NEW_TASK_CREATED)
        .and_then(|event| event.param("taskIndex"))
        .and_then(|index| index.clone().into_uint())
    {
        Some(task_index) => {
            info!("Transaction successful with hash: {:?}", receipt.transaction_hash);
            info!("{}", describe_created(task_index, &params));
            TaskOutcome::Created {
                transaction_hash: receipt.transaction_hash,
                task_index,
                params,
            }
        }
        None => {
            let events: Vec<String> = receipt.events.iter().map(|e| e.to_string()).collect();
            info!("{} event not found in transaction receipt. Inspecting all events...", NEW_TASK_CREATED);
            if events.is_empty() {
                info!("  (no events emitted)");
            }
            for event in &events {
                info!("  {}", event);
            }
            TaskOutcome::EventMissing {
                transaction_hash: receipt.transaction_hash,
                events,
            }
        }
    }
}

pub fn describe_created(task_index: U256, params: &TaskParams) -> String {
    format!(
        "Created task with index: {}, name: {}, goal amount: {} ETH, duration: {} days",
        task_index,
        params.name,
        format_ether(params.goal_amount),
        params.duration / SECONDS_PER_DAY
    )
}

/// Fires every `period`, first one `period` after the call, and never returns.
/// Each tick is spawned on its own so a slow or failing submission never holds
/// back the next one.
pub async fn start_creating_tasks<S>(service: Arc<S>, period: Duration)
where
    S: TaskService + ?Sized + 'static,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let params = {
            let mut rng = rand::thread_rng();
            let name = generate_random_name(&mut rng);
            info!("Creating new task with name: {}", name);
            let (goal_amount, duration) = generate_random_goal_and_duration(&mut rng);
            TaskParams {
                name,
                goal_amount,
                duration,
            }
        };
        let service = service.clone();
        tokio::spawn(async move {
            create_new_task(service.as_ref(), params).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{EmittedEvent, TxReceipt};
    use crate::error::Error;
    use crate::testing::MockTaskService;
    use rand::{rngs::StdRng, SeedableRng};
    use web3::ethabi::Token;
    use web3::types::Address;

    fn params() -> TaskParams {
        TaskParams {
            name: "HungryBear42".to_string(),
            goal_amount: parse_ether(17),
            duration: 3 * SECONDS_PER_DAY,
        }
    }

    #[test]
    fn test_random_name_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2000 {
            let name = generate_random_name(&mut rng);
            let adjective = ADJECTIVES.iter().find(|a| name.starts_with(*a)).expect("adjective");
            let rest = &name[adjective.len()..];
            let noun = NOUNS.iter().find(|n| rest.starts_with(*n)).expect("noun");
            let suffix = &rest[noun.len()..];
            assert!(!suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()), "{}", name);
            assert!(suffix.parse::<u32>().unwrap() < 1000);
            assert!(suffix.len() == 1 || !suffix.starts_with('0'), "{}", name);
        }
    }

    #[test]
    fn test_random_goal_and_duration_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let one = parse_ether(1);
        let (mut min_days, mut max_days) = (u64::MAX, 0);
        for _ in 0..5000 {
            let (goal, duration) = generate_random_goal_and_duration(&mut rng);
            assert!(goal % one == U256::zero());
            assert!(goal >= parse_ether(1) && goal <= parse_ether(100));
            assert_eq!(duration % SECONDS_PER_DAY, 0);
            assert!((86400..=2_592_000).contains(&duration));
            min_days = min_days.min(duration / SECONDS_PER_DAY);
            max_days = max_days.max(duration / SECONDS_PER_DAY);
        }
        assert_eq!((min_days, max_days), (1, 30));
    }

    #[tokio::test]
    async fn test_create_new_task_reports_index() {
        let service = MockTaskService::default();
        service.push_receipt(Ok(TxReceipt {
            transaction_hash: H256::repeat_byte(1),
            events: vec![EmittedEvent {
                address: service.address(),
                name: Some(NEW_TASK_CREATED.to_string()),
                params: vec![("taskIndex".to_string(), Token::Uint(U256::from(5u64)))],
                topics: vec![],
            }],
        }));

        let outcome = create_new_task(&service, params()).await;
        assert_eq!(
            outcome,
            TaskOutcome::Created {
                transaction_hash: H256::repeat_byte(1),
                task_index: U256::from(5u64),
                params: params(),
            }
        );
        assert_eq!(service.created(), vec![params()]);
    }

    #[tokio::test]
    async fn test_created_task_index_is_decimal() {
        let service = MockTaskService::default();
        service.push_receipt(Ok(TxReceipt {
            transaction_hash: H256::repeat_byte(1),
            events: vec![EmittedEvent {
                address: service.address(),
                name: Some(NEW_TASK_CREATED.to_string()),
                params: vec![("taskIndex".to_string(), Token::Uint(U256::from(255u64)))],
                topics: vec![],
            }],
        }));

        let index = match create_new_task(&service, params()).await {
            TaskOutcome::Created { task_index, .. } => task_index,
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(index, U256::from(255u64));
        assert_eq!(
            describe_created(index, &params()),
            "Created task with index: 255, name: HungryBear42, goal amount: 17.0 ETH, duration: 3 days"
        );
    }

    #[tokio::test]
    async fn test_create_new_task_without_event() {
        let service = MockTaskService::default();
        let stray = EmittedEvent {
            address: Address::repeat_byte(9),
            name: None,
            params: vec![],
            topics: vec![H256::repeat_byte(3)],
        };
        service.push_receipt(Ok(TxReceipt {
            transaction_hash: H256::repeat_byte(2),
            events: vec![stray.clone()],
        }));

        match create_new_task(&service, params()).await {
            TaskOutcome::EventMissing { transaction_hash, events } => {
                assert_eq!(transaction_hash, H256::repeat_byte(2));
                assert_eq!(events, vec![stray.to_string()]);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_new_task_swallows_errors() {
        let service = MockTaskService::default();
        service.push_receipt(Err(Error::TxReverted(H256::zero())));
        assert!(matches!(create_new_task(&service, params()).await, TaskOutcome::Failed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_keeps_firing_after_failures() {
        // every submission fails
        let service = Arc::new(MockTaskService::failing());
        let handle = tokio::spawn(start_creating_tasks(service.clone(), Duration::from_secs(24)));

        tokio::time::sleep(Duration::from_secs(23)).await;
        assert_eq!(service.created().len(), 0);

        tokio::time::sleep(Duration::from_secs(24 * 3)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        let created = service.created();
        assert_eq!(created.len(), 3);
        assert!(created.iter().all(|p| p.duration % SECONDS_PER_DAY == 0));

        handle.abort();
    }
}
