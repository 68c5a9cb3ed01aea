//! Transfer Pipeline Tests
//!
//! End-to-end checks of the build pipeline against the in-memory ledger:
//! - Positive: merge/split/transfer shapes for generic and native coins
//! - Negative: no funds, overdraft, bad amounts, ledger failures
//! - Conservation: sent + retained always equals the aggregated balance

use crate::ledger::LedgerError;
use crate::test_utils::{coin, coins_of, MockLedgerClient, MockSigner};
use crate::tx_builder::{
    resolve_intent, simulate_transfer, BuilderConfig, CoinSource, Command, PageLimits,
    SendAmountMode, SendForm, TransferBuilder, TransferError, TransferIntent,
};
use crate::types::{CoinType, ObjectId, NATIVE_COIN_TYPE};
use num_bigint::BigUint;
use std::sync::Arc;

const SENDER: &str = "0x796966bf3c64958eda9d69f92d4ab3a23fad2b7a8562933cbd8a092ff2886b77";
const RECIPIENT: &str = "0xfdb0c3a3cb644df65a4d549be8e870f88e7f2a145c78982d573ee98b8b077487";

fn hero() -> CoinType {
    CoinType::new("0x5::hero::HERO")
}

fn form(coin_type: &str, decimals: u8, mode: SendAmountMode) -> TransferIntent {
    let resolved = resolve_intent(SendForm {
        recipient: RECIPIENT.to_string(),
        sender: SENDER.to_string(),
        coin_type: coin_type.to_string(),
        decimals: Some(decimals),
        mode,
    });
    assert!(resolved.can_build);
    resolved.intent
}

fn builder(ledger: MockLedgerClient) -> TransferBuilder<MockLedgerClient> {
    TransferBuilder::new(Arc::new(ledger), BuilderConfig::default())
}

fn command_names(commands: &[Command]) -> Vec<&'static str> {
    commands.iter().map(Command::name).collect()
}

#[tokio::test]
async fn test_exact_total_takes_whole_object_path() {
    let ledger = MockLedgerClient::with_pages(vec![vec![
        coin("0x1", &hero(), 300),
        coin("0x2", &hero(), 700),
    ]]);

    let output = builder(ledger)
        .build(
            &form(hero().as_str(), 0, SendAmountMode::amount("1000")),
            CoinSource::Ledger,
        )
        .await
        .unwrap();

    assert_eq!(
        command_names(&output.operation.commands),
        vec!["MergeCoins", "TransferObjects"]
    );
    assert!(output.summary.whole_object);
    assert_eq!(output.summary.amount, BigUint::from(1000u32));
}

#[tokio::test]
async fn test_partial_amount_retains_remainder() {
    let coins = vec![coin("0x1", &hero(), 300), coin("0x2", &hero(), 700)];
    let ledger = MockLedgerClient::with_pages(vec![coins.clone()]);

    let output = builder(ledger)
        .build(
            &form(hero().as_str(), 0, SendAmountMode::amount("250")),
            CoinSource::Ledger,
        )
        .await
        .unwrap();

    assert_eq!(
        command_names(&output.operation.commands),
        vec!["MergeCoins", "SplitCoins", "TransferObjects"]
    );

    let report = simulate_transfer(&output.operation, &coins).unwrap();
    assert_eq!(report.sent, BigUint::from(250u32));
    assert_eq!(report.retained, BigUint::from(750u32));
}

#[tokio::test]
async fn test_send_all_native_across_pages() {
    let native = CoinType::native();
    let ledger = MockLedgerClient::with_pages(vec![
        coins_of(&native, 3, 1_000_000_000),
        vec![coin("0x10", &native, 500_000_000)],
    ]);

    let output = builder(ledger)
        .build(&form(NATIVE_COIN_TYPE, 9, SendAmountMode::All), CoinSource::Ledger)
        .await
        .unwrap();

    assert!(output.summary.native);
    assert_eq!(output.summary.total, BigUint::from(3_500_000_000u64));
    assert_eq!(output.summary.merged, 3);
    assert_eq!(output.operation.gas_payment, vec![ObjectId::from("0x1")]);
    assert!(!output.operation.has_split());
}

#[tokio::test]
async fn test_snapshot_overrides_ledger() {
    let ledger = MockLedgerClient::failing(LedgerError::Transport("offline".to_string()));
    let b = builder(ledger);

    let output = b
        .build(
            &form(hero().as_str(), 2, SendAmountMode::amount("1.25")),
            CoinSource::Snapshot(vec![coin("0x1", &hero(), 500)]),
        )
        .await
        .unwrap();

    assert_eq!(output.operation.split_amounts(), vec![&BigUint::from(125u32)]);
    assert_eq!(b.ledger().request_count(), 0);
}

#[tokio::test]
async fn test_overlapping_pages_do_not_inflate_balance() {
    let overlapping = || {
        MockLedgerClient::with_pages(vec![
            vec![coin("0x1", &hero(), 300)],
            vec![coin("0x1", &hero(), 300), coin("0x2", &hero(), 100)],
        ])
    };

    let err = builder(overlapping())
        .build(
            &form(hero().as_str(), 0, SendAmountMode::amount("500")),
            CoinSource::Ledger,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::InsufficientBalance { .. }));

    let output = builder(overlapping())
        .build(&form(hero().as_str(), 0, SendAmountMode::All), CoinSource::Ledger)
        .await
        .unwrap();
    assert_eq!(output.summary.total, BigUint::from(400u32));
    assert_eq!(output.summary.merged, 1);
}

#[tokio::test]
async fn test_boundary_errors() {
    let empty = builder(MockLedgerClient::with_pages(vec![vec![]]));
    let err = empty
        .build(&form(hero().as_str(), 0, SendAmountMode::All), CoinSource::Ledger)
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::NoFunds { .. }));

    let funded = builder(MockLedgerClient::with_pages(vec![vec![coin("0x1", &hero(), 10)]]));
    let err = funded
        .build(
            &form(hero().as_str(), 0, SendAmountMode::amount("11")),
            CoinSource::Ledger,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::InsufficientBalance { .. }));

    let funded = builder(MockLedgerClient::with_pages(vec![vec![coin("0x1", &hero(), 10)]]));
    let err = funded
        .build(
            &form(hero().as_str(), 0, SendAmountMode::amount("abc")),
            CoinSource::Ledger,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::InvalidAmount(_)));
}

#[tokio::test]
async fn test_page_ceiling_is_enforced() {
    let config = BuilderConfig {
        limits: PageLimits {
            page_size: 1,
            max_pages: Some(3),
        },
        ..BuilderConfig::default()
    };
    let b = TransferBuilder::new(
        Arc::new(MockLedgerClient::endless(coin("0x1", &hero(), 1))),
        config,
    );

    let err = b
        .build(&form(hero().as_str(), 0, SendAmountMode::All), CoinSource::Ledger)
        .await
        .unwrap_err();
    assert_eq!(err.category(), "ledger_fetch");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_send_round_trip() {
    let ledger = MockLedgerClient::with_pages(vec![vec![coin("0x1", &hero(), 42)]]);
    let signer = MockSigner::new();

    let receipt = builder(ledger)
        .send(
            &form(hero().as_str(), 0, SendAmountMode::amount("40")),
            CoinSource::Ledger,
            &signer,
            "iota:devnet",
        )
        .await
        .unwrap();

    assert!(receipt.status.is_success());
    assert_eq!(receipt.summary.remainder, BigUint::from(2u32));
    assert!(receipt.trace.parent_span_id.is_some());
}
