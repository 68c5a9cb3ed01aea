//! Coin aggregation across ledger pages
//!
//! Collects every coin object of one type owned by the sender. Pages are
//! fetched strictly sequentially: each request needs the previous page's
//! cursor. A caller-supplied snapshot short-circuits the ledger entirely.

use crate::ledger::{LedgerClient, LedgerError};
use crate::metrics::{record, Timer};
use crate::tx_builder::errors::{TransferError, TransferResult};
use crate::types::{Address, CoinObject, CoinType};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Default page size requested from the ledger
pub const DEFAULT_PAGE_SIZE: usize = 200;

/// Default ceiling on pages fetched for a single aggregation
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Where the coins for a transfer come from
#[derive(Debug, Clone, Default)]
pub enum CoinSource {
    /// Page through the ledger
    #[default]
    Ledger,
    /// Pre-fetched coins. Only entries of the requested type are used; an
    /// empty snapshot falls back to the ledger.
    Snapshot(Vec<CoinObject>),
}

/// Pagination bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub page_size: usize,
    /// `None` pages until the cursor runs out, however long that takes
    pub max_pages: Option<usize>,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: Some(DEFAULT_MAX_PAGES),
        }
    }
}

/// Coins gathered for one transfer
#[derive(Debug, Clone, Default)]
pub struct CollectedCoins {
    pub coins: Vec<CoinObject>,
    /// Pages fetched from the ledger, 0 for a snapshot
    pub pages: usize,
}

/// Fetch every coin of `coin_type` owned by `owner`
///
/// Pages are concatenated in ledger order; an object id already seen on an
/// earlier page is dropped. Pagination stops at the first
/// page without a continuation cursor; an empty cursor string counts as
/// none.
///
/// # Errors
///
/// `TransferError::LedgerFetch` carrying the zero-based page index when a
/// fetch fails or when `limits.max_pages` pages did not exhaust the cursor.
/// Partial results are discarded.
pub async fn fetch_all_coins<L>(
    ledger: &L,
    owner: &Address,
    coin_type: &CoinType,
    limits: PageLimits,
) -> TransferResult<CollectedCoins>
where
    L: LedgerClient + ?Sized,
{
    let mut coins = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor: Option<String> = None;
    let mut page = 0usize;

    loop {
        if let Some(max_pages) = limits.max_pages {
            if page >= max_pages {
                warn!(
                    owner = %owner,
                    coin_type = %coin_type,
                    max_pages,
                    "Coin pagination did not terminate"
                );
                return Err(TransferError::LedgerFetch {
                    page,
                    source: LedgerError::PageLimitExceeded { max_pages },
                });
            }
        }

        let timer = Timer::with_name("ledger_latency_seconds");
        let result = ledger
            .list_owned_coins(owner, coin_type, cursor.as_deref(), limits.page_size)
            .await;
        timer.finish();

        let fetched = result.map_err(|source| TransferError::LedgerFetch { page, source })?;
        record(|m| m.coin_pages_fetched.inc());

        debug!(
            page,
            coins = fetched.data.len(),
            has_next = fetched.next_cursor.is_some(),
            "Fetched coin page"
        );

        let before = coins.len();
        let received = fetched.data.len();
        coins.extend(
            fetched
                .data
                .into_iter()
                .filter(|c| seen.insert(c.coin_object_id.clone())),
        );
        let repeated = received - (coins.len() - before);
        if repeated > 0 {
            warn!(page, repeated, "Dropped coin objects already seen on earlier pages");
        }
        page += 1;

        match fetched.next_cursor {
            Some(next) if !next.is_empty() => cursor = Some(next),
            _ => break,
        }
    }

    Ok(CollectedCoins { coins, pages: page })
}

/// Resolve the coins for a transfer from `source`
///
/// A non-empty snapshot is filtered to `coin_type` and de-duplicated by
/// object id without touching the ledger, even if the filter leaves nothing. An empty snapshot behaves like
/// [`CoinSource::Ledger`].
pub async fn collect_coins<L>(
    ledger: &L,
    owner: &Address,
    coin_type: &CoinType,
    source: CoinSource,
    limits: PageLimits,
) -> TransferResult<CollectedCoins>
where
    L: LedgerClient + ?Sized,
{
    match source {
        CoinSource::Snapshot(snapshot) if !snapshot.is_empty() => {
            let mut seen = HashSet::new();
            let coins = snapshot
                .into_iter()
                .filter(|c| &c.coin_type == coin_type)
                .filter(|c| seen.insert(c.coin_object_id.clone()))
                .collect();
            Ok(CollectedCoins { coins, pages: 0 })
        }
        _ => fetch_all_coins(ledger, owner, coin_type, limits).await,
    }
}
