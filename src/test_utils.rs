//! Test Utilities Module
//!
//! Deterministic doubles for the ledger and the signer, plus coin fixtures.
//! Nothing here touches the network.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use crate::ledger::{
    ExecutionResult, ExecutionStatus, LedgerClient, LedgerError, LedgerResult, TransactionDigest,
    TransactionSigner,
};
use crate::tx_builder::TransferBuildOutput;
use crate::types::{Address, CoinObject, CoinPage, CoinType};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Coin fixture with the given id, type and balance
pub fn coin(id: &str, coin_type: &CoinType, balance: u64) -> CoinObject {
    CoinObject::new(id, coin_type.clone(), balance)
}

/// `count` coins of `balance` each, ids `0x1..=0x{count}`
pub fn coins_of(coin_type: &CoinType, count: usize, balance: u64) -> Vec<CoinObject> {
    (1..=count)
        .map(|i| coin(&format!("0x{:x}", i), coin_type, balance))
        .collect()
}

#[derive(Debug, Clone)]
enum PageScript {
    /// Fixed pages; page `i` carries cursor `i + 1` unless it is the last
    Pages(Vec<Vec<CoinObject>>),
    /// Every response holds this coin and a fresh cursor
    Endless(CoinObject),
    /// Every request fails
    Failing(LedgerError),
}

/// Scripted in-memory ledger
///
/// Pages are served by position: the cursor handed out with page `i` is the
/// string `i + 1`, and it must come back unchanged for the next request.
#[derive(Debug)]
pub struct MockLedgerClient {
    script: PageScript,
    fail_at: Option<(usize, LedgerError)>,
    gas_price: Result<u64, LedgerError>,
    execution_status: Result<ExecutionStatus, LedgerError>,
    cursors: Mutex<Vec<Option<String>>>,
}

impl MockLedgerClient {
    fn from_script(script: PageScript) -> Self {
        Self {
            script,
            fail_at: None,
            gas_price: Ok(1000),
            execution_status: Ok(ExecutionStatus::Success),
            cursors: Mutex::new(Vec::new()),
        }
    }

    pub fn with_pages(pages: Vec<Vec<CoinObject>>) -> Self {
        Self::from_script(PageScript::Pages(pages))
    }

    /// A ledger whose cursor never runs out
    pub fn endless(coin: CoinObject) -> Self {
        Self::from_script(PageScript::Endless(coin))
    }

    pub fn failing(error: LedgerError) -> Self {
        Self::from_script(PageScript::Failing(error))
    }

    /// Fail the request for zero-based page `page`
    pub fn fail_at_page(mut self, page: usize, error: LedgerError) -> Self {
        self.fail_at = Some((page, error));
        self
    }

    pub fn with_gas_price(mut self, gas_price: u64) -> Self {
        self.gas_price = Ok(gas_price);
        self
    }

    pub fn with_gas_price_error(mut self, error: LedgerError) -> Self {
        self.gas_price = Err(error);
        self
    }

    pub fn with_execution_status(mut self, status: ExecutionStatus) -> Self {
        self.execution_status = Ok(status);
        self
    }

    /// Make `await_confirmation` fail with `error`
    pub fn with_confirmation_error(mut self, error: LedgerError) -> Self {
        self.execution_status = Err(error);
        self
    }

    /// Cursor passed with every coin request, in order
    pub fn requested_cursors(&self) -> Vec<Option<String>> {
        lock(&self.cursors).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.cursors).len()
    }
}

#[async_trait]
impl LedgerClient for MockLedgerClient {
    async fn list_owned_coins(
        &self,
        _owner: &Address,
        _coin_type: &CoinType,
        cursor: Option<&str>,
        _limit: usize,
    ) -> LedgerResult<CoinPage> {
        let page = {
            let mut cursors = lock(&self.cursors);
            cursors.push(cursor.map(str::to_string));
            cursors.len() - 1
        };

        let expected = (page > 0).then(|| page.to_string());
        if cursor.map(str::to_string) != expected {
            return Err(LedgerError::Rpc {
                code: -32602,
                message: format!("unexpected cursor {:?} for page {}", cursor, page),
            });
        }

        if let Some((fail_page, error)) = &self.fail_at {
            if *fail_page == page {
                return Err(error.clone());
            }
        }

        match &self.script {
            PageScript::Pages(pages) => {
                let data = pages.get(page).cloned().unwrap_or_default();
                let next_cursor = (page + 1 < pages.len()).then(|| (page + 1).to_string());
                Ok(CoinPage { data, next_cursor })
            }
            PageScript::Endless(coin) => Ok(CoinPage {
                data: vec![coin.clone()],
                next_cursor: Some((page + 1).to_string()),
            }),
            PageScript::Failing(error) => Err(error.clone()),
        }
    }

    async fn reference_gas_price(&self) -> LedgerResult<u64> {
        self.gas_price.clone()
    }

    async fn submit(&self, tx_bytes: &[u8], _signatures: &[String]) -> LedgerResult<TransactionDigest> {
        Ok(TransactionDigest::new(
            bs58::encode(Sha256::digest(tx_bytes)).into_string(),
        ))
    }

    async fn await_confirmation(&self, _digest: &TransactionDigest) -> LedgerResult<ExecutionStatus> {
        self.execution_status.clone()
    }
}

/// Signer double that "executes" by echoing the operation digest
#[derive(Debug, Default)]
pub struct MockSigner {
    failure: Option<String>,
    chains: Mutex<Vec<String>>,
    digests: Mutex<Vec<TransactionDigest>>,
}

impl MockSigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A signer that rejects every request with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Chain identifiers requested so far
    pub fn chains(&self) -> Vec<String> {
        lock(&self.chains).clone()
    }

    pub fn last_digest(&self) -> Option<TransactionDigest> {
        lock(&self.digests).last().cloned()
    }
}

#[async_trait]
impl TransactionSigner for MockSigner {
    async fn sign_and_execute(
        &self,
        output: &TransferBuildOutput,
        chain: &str,
    ) -> anyhow::Result<ExecutionResult> {
        lock(&self.chains).push(chain.to_string());
        if let Some(message) = &self.failure {
            return Err(anyhow::anyhow!("{}", message));
        }

        let digest = TransactionDigest::new(output.digest.clone());
        lock(&self.digests).push(digest.clone());
        Ok(ExecutionResult { digest })
    }
}
