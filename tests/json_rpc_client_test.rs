//! Integration tests for the JSON-RPC ledger client
//!
//! This test validates, against a local mock node:
//! - Coin pagination driven through `fetch_all_coins`
//! - Reference gas price decoding
//! - JSON-RPC error mapping
//! - Submission and confirmation polling

use coin_send::ledger::{ExecutionStatus, LedgerClient, LedgerError, TransactionDigest};
use coin_send::rpc_client::JsonRpcLedgerClient;
use coin_send::tx_builder::{fetch_all_coins, PageLimits, TransferError};
use coin_send::types::{Address, CoinType};
use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;

fn owner() -> Address {
    Address::new("0x796966bf3c64958eda9d69f92d4ab3a23fad2b7a8562933cbd8a092ff2886b77")
}

fn client(url: String) -> JsonRpcLedgerClient {
    JsonRpcLedgerClient::new(url, Duration::from_secs(5))
        .unwrap()
        .with_confirmation(Duration::from_millis(10), Duration::from_millis(200))
}

fn rpc_result(result: serde_json::Value) -> String {
    json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string()
}

fn coin_json(id: &str, balance: &str) -> serde_json::Value {
    json!({
        "coinType": "0x2::iota::IOTA",
        "coinObjectId": id,
        "version": "1",
        "digest": "11111111111111111111111111111111",
        "balance": balance,
        "previousTransaction": "11111111111111111111111111111111"
    })
}

#[tokio::test]
async fn test_pagination_follows_cursor() {
    let mut server = Server::new_async().await;

    let first = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "method": "iotax_getCoins",
            "params": [owner().as_str(), "0x2::iota::IOTA", null, 200]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(rpc_result(json!({
            "data": [coin_json("0x1", "300"), coin_json("0x2", "700")],
            "nextCursor": "0x2",
            "hasNextPage": true
        })))
        .create_async()
        .await;

    let second = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "method": "iotax_getCoins",
            "params": [owner().as_str(), "0x2::iota::IOTA", "0x2", 200]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(rpc_result(json!({
            "data": [coin_json("0x3", "18446744073709551616")],
            "nextCursor": "0x3",
            "hasNextPage": false
        })))
        .create_async()
        .await;

    let ledger = client(server.url());
    let collected = fetch_all_coins(&ledger, &owner(), &CoinType::native(), PageLimits::default())
        .await
        .unwrap();

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(collected.pages, 2);
    assert_eq!(collected.coins.len(), 3);
    // 2^64, past u64
    assert_eq!(collected.coins[2].balance.to_string(), "18446744073709551616");
}

#[tokio::test]
async fn test_rpc_error_is_reported_with_page() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32602, "message": "Invalid params" }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let ledger = client(server.url());
    let err = fetch_all_coins(&ledger, &owner(), &CoinType::native(), PageLimits::default())
        .await
        .unwrap_err();

    match err {
        TransferError::LedgerFetch {
            page,
            source: LedgerError::Rpc { code, message },
        } => {
            assert_eq!(page, 0);
            assert_eq!(code, -32602);
            assert_eq!(message, "Invalid params");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_http_failure_is_transport_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/")
        .with_status(503)
        .create_async()
        .await;

    let err = client(server.url()).reference_gas_price().await.unwrap_err();
    assert!(matches!(err, LedgerError::Transport(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_reference_gas_price() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({ "method": "iotax_getReferenceGasPrice" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(rpc_result(json!("1000")))
        .create_async()
        .await;

    assert_eq!(client(server.url()).reference_gas_price().await.unwrap(), 1000);
}

#[tokio::test]
async fn test_submit_returns_digest() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "method": "iota_executeTransactionBlock",
            "params": ["AQID", ["c2ln"]]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(rpc_result(json!({ "digest": "DigestABC" })))
        .create_async()
        .await;

    let digest = client(server.url())
        .submit(&[1, 2, 3], &["c2ln".to_string()])
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(digest.as_str(), "DigestABC");
}

#[tokio::test]
async fn test_confirmation_reports_failure() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({ "method": "iota_getTransactionBlock" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(rpc_result(json!({
            "digest": "DigestABC",
            "effects": { "status": { "status": "failure", "error": "InsufficientCoinBalance" } }
        })))
        .create_async()
        .await;

    let status = client(server.url())
        .await_confirmation(&TransactionDigest::new("DigestABC"))
        .await
        .unwrap();
    assert_eq!(
        status,
        ExecutionStatus::Failure {
            error: "InsufficientCoinBalance".to_string()
        }
    );
}

#[tokio::test]
async fn test_confirmation_times_out() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32602, "message": "Could not find the referenced transaction" }
            })
            .to_string(),
        )
        .expect_at_least(2)
        .create_async()
        .await;

    let err = client(server.url())
        .await_confirmation(&TransactionDigest::new("Unknown"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ConfirmationTimeout { .. }));
}
