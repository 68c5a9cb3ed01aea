//! Integration tests for transfer building
//!
//! This test validates through the public API:
//! - Pagination: N pages of k coins aggregate to N·k coins
//! - Conservation: sent + retained equals the aggregated balance
//! - Send-all and exact-total paths never split
//! - Partial sends split exactly once, for exactly the requested amount

use async_trait::async_trait;
use coin_send::ledger::{ExecutionStatus, LedgerClient, LedgerResult, TransactionDigest};
use coin_send::tx_builder::{
    assemble_transfer, simulate_transfer, BuilderConfig, CoinSource, Command, SendAmountMode,
    TransferBuilder, TransferIntent,
};
use coin_send::types::{total_balance, Address, CoinObject, CoinPage, CoinType};
use num_bigint::BigUint;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Ledger serving `pages` pages of `per_page` coins each
struct PagedLedger {
    pages: usize,
    per_page: usize,
    balance: u64,
    requests: AtomicUsize,
}

#[async_trait]
impl LedgerClient for PagedLedger {
    async fn list_owned_coins(
        &self,
        _owner: &Address,
        coin_type: &CoinType,
        cursor: Option<&str>,
        _limit: usize,
    ) -> LedgerResult<CoinPage> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let page: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let data = (0..self.per_page)
            .map(|i| {
                CoinObject::new(
                    format!("0x{:x}", page * self.per_page + i + 1),
                    coin_type.clone(),
                    self.balance,
                )
            })
            .collect();
        let next_cursor = (page + 1 < self.pages).then(|| (page + 1).to_string());
        Ok(CoinPage { data, next_cursor })
    }

    async fn reference_gas_price(&self) -> LedgerResult<u64> {
        Ok(1000)
    }

    async fn submit(&self, _tx_bytes: &[u8], _signatures: &[String]) -> LedgerResult<TransactionDigest> {
        Ok(TransactionDigest::new("unused"))
    }

    async fn await_confirmation(&self, _digest: &TransactionDigest) -> LedgerResult<ExecutionStatus> {
        Ok(ExecutionStatus::Success)
    }
}

fn hero() -> CoinType {
    CoinType::new("0x5::hero::HERO")
}

fn intent(coin_type: CoinType, mode: SendAmountMode) -> TransferIntent {
    TransferIntent {
        coin_type,
        decimals: Some(0),
        sender: Address::new(format!("0x{}", "a".repeat(64))),
        recipient: Address::new(format!("0x{}", "b".repeat(64))),
        mode,
    }
}

fn coins(coin_type: &CoinType, balances: &[u64]) -> Vec<CoinObject> {
    balances
        .iter()
        .enumerate()
        .map(|(i, b)| CoinObject::new(format!("0x{:x}", i + 1), coin_type.clone(), *b))
        .collect()
}

fn splits(commands: &[Command]) -> usize {
    commands
        .iter()
        .filter(|c| matches!(c, Command::SplitCoins { .. }))
        .count()
}

#[tokio::test]
async fn test_pages_times_per_page_coins() {
    for (pages, per_page) in [(1, 1), (3, 4), (7, 200)] {
        let ledger = Arc::new(PagedLedger {
            pages,
            per_page,
            balance: 2,
            requests: AtomicUsize::new(0),
        });
        let builder = TransferBuilder::new(Arc::clone(&ledger), BuilderConfig::default());

        let output = builder
            .build(&intent(hero(), SendAmountMode::All), CoinSource::Ledger)
            .await
            .unwrap();

        assert_eq!(output.summary.coins_used, pages * per_page);
        assert_eq!(output.summary.total, BigUint::from(2 * pages * per_page));
        assert_eq!(ledger.requests.load(Ordering::SeqCst), pages);
    }
}

proptest! {
    #[test]
    fn prop_partial_send_conserves_value(
        balances in prop::collection::vec(1u64..1_000_000, 1..20),
        fraction in 0.0f64..1.0,
    ) {
        let coins = coins(&hero(), &balances);
        let total: u64 = balances.iter().sum();
        let requested = ((total as f64) * fraction) as u64;
        prop_assume!(requested < total);

        let plan = assemble_transfer(
            &intent(hero(), SendAmountMode::amount(requested.to_string())),
            &coins,
            &CoinType::native(),
        )
        .unwrap();

        let expected = BigUint::from(requested);
        prop_assert_eq!(splits(&plan.operation.commands), 1);
        prop_assert_eq!(plan.operation.split_amounts(), vec![&expected]);

        let report = simulate_transfer(&plan.operation, &coins).unwrap();
        prop_assert_eq!(&report.sent, &expected);
        prop_assert_eq!(&report.sent + &report.retained, total_balance(&coins));
        prop_assert_eq!(report.retained, BigUint::from(total - requested));
    }

    #[test]
    fn prop_send_all_leaves_nothing(
        balances in prop::collection::vec(1u64..1_000_000, 1..20),
        native in any::<bool>(),
    ) {
        let coin_type = if native { CoinType::native() } else { hero() };
        let coins = coins(&coin_type, &balances);

        let plan = assemble_transfer(
            &intent(coin_type, SendAmountMode::All),
            &coins,
            &CoinType::native(),
        )
        .unwrap();

        prop_assert_eq!(splits(&plan.operation.commands), 0);
        prop_assert_eq!(plan.summary.merged, balances.len() - 1);

        let report = simulate_transfer(&plan.operation, &coins).unwrap();
        prop_assert_eq!(report.sent, total_balance(&coins));
        prop_assert_eq!(report.retained, BigUint::from(0u8));
        prop_assert_eq!(report.zero_value_objects, 0);
    }

    #[test]
    fn prop_exact_total_amount_never_splits(
        balances in prop::collection::vec(1u64..1_000_000, 1..20),
    ) {
        let coins = coins(&hero(), &balances);
        let total: u64 = balances.iter().sum();

        let plan = assemble_transfer(
            &intent(hero(), SendAmountMode::amount(total.to_string())),
            &coins,
            &CoinType::native(),
        )
        .unwrap();

        prop_assert!(plan.summary.whole_object);
        prop_assert_eq!(splits(&plan.operation.commands), 0);
    }

    #[test]
    fn prop_overdraft_always_rejected(
        balances in prop::collection::vec(1u64..1_000_000, 0..20),
        excess in 1u64..1_000,
    ) {
        let coins = coins(&hero(), &balances);
        let total: u64 = balances.iter().sum();

        let result = assemble_transfer(
            &intent(hero(), SendAmountMode::amount((total + excess).to_string())),
            &coins,
            &CoinType::native(),
        );
        prop_assert!(result.is_err());
    }
}
