use orderwallet::application::engine::{Outcome, WalletEngine};
use orderwallet::config::EngineConfig;
use orderwallet::domain::wallet::ConsumePriority;
use orderwallet::error::ErrorCode;
use orderwallet::infrastructure::clock::FixedClock;
use orderwallet::infrastructure::in_memory::InMemoryWalletStore;
use std::sync::Arc;

mod common;
use common::*;

/// Two engines over one store stand in for two service instances.
fn instances(store: &InMemoryWalletStore, count: usize) -> Vec<Arc<WalletEngine>> {
    (0..count)
        .map(|_| {
            let config = EngineConfig {
                max_commit_retries: 64,
                ..EngineConfig::default()
            };
            Arc::new(WalletEngine::new(
                Box::new(directory()),
                Box::new(store.clone()),
                Box::new(FixedClock::at(t0())),
                config,
            ))
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_credit_race_has_one_winner() {
    for round in 0..25 {
        let store = store_with_wallet(1, 0, ConsumePriority::BonusFirst).await;
        let engines = instances(&store, 2);

        let a = {
            let engine = engines[0].clone();
            tokio::spawn(async move { engine.debit(&debit("order-a")).await })
        };
        let b = {
            let engine = engines[1].clone();
            tokio::spawn(async move { engine.debit(&debit("order-b")).await })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "round {}: {:?}", round, results);
        let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(
            matches!(
                loser.code(),
                ErrorCode::WalletExhausted | ErrorCode::InsufficientOrders
            ),
            "round {}: unexpected {:?}",
            round,
            loser
        );

        let wallet = engines[0].wallet(BRANCH).await.unwrap();
        assert_eq!(wallet.total_orders_remaining(), 0);
        assert!(wallet.ordering_locked);
        assert_eq!(engines[0].ledger(BRANCH).await.unwrap().len(), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_order_race_collapses_to_one_debit() {
    let store = store_with_wallet(10, 0, ConsumePriority::PaidFirst).await;
    let engines = instances(&store, 4);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = engines[i % engines.len()].clone();
            tokio::spawn(async move { engine.debit(&debit("order-dup")).await })
        })
        .collect();

    let mut succeeded = 0;
    let mut replayed = 0;
    let mut ledger_ids = Vec::new();
    for handle in handles {
        let receipt = handle.await.unwrap().unwrap();
        match receipt.outcome {
            Outcome::Succeeded => succeeded += 1,
            Outcome::Replayed => replayed += 1,
        }
        ledger_ids.push(receipt.ledger_entry.ledger_id);
    }
    assert_eq!(succeeded, 1);
    assert_eq!(replayed, 7);
    ledger_ids.dedup();
    assert_eq!(ledger_ids.len(), 1);
    assert_eq!(
        engines[0].wallet(BRANCH).await.unwrap().paid_orders_remaining,
        9
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_lost_updates_across_instances() {
    let store = store_with_wallet(20, 5, ConsumePriority::BonusFirst).await;
    let engines = instances(&store, 3);

    let handles: Vec<_> = (0..40)
        .map(|i| {
            let engine = engines[i % engines.len()].clone();
            tokio::spawn(async move { engine.debit(&debit(&format!("order-{}", i))).await })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(e) => assert!(
                matches!(
                    e.code(),
                    ErrorCode::WalletExhausted | ErrorCode::InsufficientOrders
                ),
                "unexpected {:?}",
                e
            ),
        }
    }

    assert_eq!(succeeded, 25);
    let wallet = engines[0].wallet(BRANCH).await.unwrap();
    assert_eq!(wallet.paid_orders_remaining, 0);
    assert_eq!(wallet.bonus_orders_remaining, 0);
    assert_eq!(engines[0].ledger(BRANCH).await.unwrap().len(), 25);
}
