//! Core TransferBuilder implementation
//!
//! [`TransferBuilder`] orchestrates the whole pipeline by composing the
//! intent, aggregation, planning, simulation and output modules:
//!
//! 1. validate the intent
//! 2. collect the sender's coins (snapshot or paginated ledger fetch)
//! 3. assemble the merge/split/transfer operation
//! 4. check command shape (debug builds) and conservation (always)
//! 5. record the reference gas price and serialize
//!
//! `send` continues with signing, execution and confirmation.
//! Nothing is retried internally; retry policy belongs to the caller.

use crate::ledger::{
    ExecutionStatus, LedgerClient, LedgerError, TransactionDigest, TransactionSigner,
};
use crate::metrics::{record, Timer};
use crate::observability::TraceContext;
use crate::structured_logging::TransferLogger;
use crate::tx_builder::aggregate::{collect_coins, CoinSource, PageLimits};
use crate::tx_builder::errors::{TransferError, TransferResult};
use crate::tx_builder::intent::TransferIntent;
use crate::tx_builder::operation::sanity_check_command_order;
use crate::tx_builder::output::{SendReceipt, TransferBuildOutput};
use crate::tx_builder::plan::{assemble_transfer, TransferPlan};
use crate::tx_builder::simulate::simulate_transfer;
use crate::types::{total_balance, CoinObject, CoinType};
use std::sync::Arc;
use tracing::{debug, error};

/// Builder settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Coin type whose primary coin doubles as the gas coin
    pub native_coin_type: CoinType,
    pub limits: PageLimits,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            native_coin_type: CoinType::native(),
            limits: PageLimits::default(),
        }
    }
}

/// Builds, and optionally sends, coin transfers for one ledger
pub struct TransferBuilder<L: LedgerClient> {
    ledger: Arc<L>,
    config: BuilderConfig,
}

impl<L: LedgerClient> Clone for TransferBuilder<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            config: self.config.clone(),
        }
    }
}

impl<L: LedgerClient> TransferBuilder<L> {
    pub fn new(ledger: Arc<L>, config: BuilderConfig) -> Self {
        Self { ledger, config }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Build the unsigned transfer for `intent`
    ///
    /// # Errors
    ///
    /// Any [`TransferError`] raised along the pipeline; no output is produced
    /// on failure. Failures are counted per category.
    pub async fn build(
        &self,
        intent: &TransferIntent,
        source: CoinSource,
    ) -> TransferResult<TransferBuildOutput> {
        let trace = TraceContext::new("build_transfer");
        let logger = TransferLogger::for_trace(&trace);
        let timer = Timer::new();

        record(|m| m.builds_total.inc());
        logger.log_build_attempt(intent.coin_type.as_str(), intent.mode.is_all());

        let result = self.build_inner(intent, source, trace, &logger).await;
        let latency_ms = timer.elapsed_ms();

        match &result {
            Ok(output) => {
                record(|m| {
                    m.builds_success.inc();
                    timer.observe_duration(&m.build_latency);
                });
                logger.log_build_success(&output.digest, latency_ms);
            }
            Err(e) => {
                record(|m| m.record_failure(e.category()));
                logger.log_build_failure(e.category(), &e.to_string(), latency_ms);
            }
        }

        result
    }

    async fn build_inner(
        &self,
        intent: &TransferIntent,
        source: CoinSource,
        trace: TraceContext,
        logger: &TransferLogger,
    ) -> TransferResult<TransferBuildOutput> {
        intent.validate()?;

        let collected = collect_coins(
            self.ledger.as_ref(),
            &intent.sender,
            &intent.coin_type,
            source,
            self.config.limits,
        )
        .await?;
        logger.log_coins_collected(
            intent.coin_type.as_str(),
            collected.coins.len(),
            collected.pages,
        );

        let plan = assemble_transfer(intent, &collected.coins, &self.config.native_coin_type)?;
        logger.log_plan(
            &plan.summary.total.to_string(),
            &plan.summary.amount.to_string(),
            plan.summary.merged,
            !plan.summary.whole_object,
        );

        sanity_check_command_order(&plan.operation)?;
        verify_conservation(&plan, &collected.coins)?;

        record(|m| {
            m.coins_merged.inc_by(plan.summary.merged as u64);
            if !plan.summary.whole_object {
                m.splits_total.inc();
            }
        });

        let gas_price = self.ledger.reference_gas_price().await?;
        debug!(gas_price, "Recorded reference gas price");

        TransferBuildOutput::new(plan, gas_price, trace)
    }

    /// Build, sign, execute and wait for confirmation
    ///
    /// `chain` identifies the network for the signer, e.g. `iota:testnet`.
    ///
    /// # Errors
    ///
    /// Build errors as for [`TransferBuilder::build`]; signer failures as
    /// `SignAndSubmit` with the signer's message untouched; a ledger-reported
    /// failure or a confirmation timeout as `Confirmation`. Transport errors
    /// while polling stay `Ledger`. Send-phase failures are counted apart
    /// from build failures.
    pub async fn send<S>(
        &self,
        intent: &TransferIntent,
        source: CoinSource,
        signer: &S,
        chain: &str,
    ) -> TransferResult<SendReceipt>
    where
        S: TransactionSigner + ?Sized,
    {
        let output = self.build(intent, source).await?;
        self.sign_and_confirm(output, signer, chain).await
    }

    /// Hand a built output to `signer` and wait for the ledger's verdict
    pub async fn sign_and_confirm<S>(
        &self,
        output: TransferBuildOutput,
        signer: &S,
        chain: &str,
    ) -> TransferResult<SendReceipt>
    where
        S: TransactionSigner + ?Sized,
    {
        let trace = output.trace.child_span("sign_and_confirm");
        let logger = TransferLogger::for_trace(&trace);
        let timer = Timer::with_name("confirmation_latency_seconds");

        record(|m| m.sends_total.inc());

        let executed = match signer.sign_and_execute(&output, chain).await {
            Ok(executed) => executed,
            Err(e) => {
                error!(context_id = %logger.context_id(), error = %e, "Signer rejected transfer");
                let err = TransferError::SignAndSubmit(e);
                record(|m| m.record_send_failure(err.category()));
                return Err(err);
            }
        };
        logger.log_submitted(executed.digest.as_str(), chain);

        let status = self.confirm(&executed.digest).await;
        let latency_ms = timer.elapsed_ms();
        timer.finish();

        let status = status.inspect_err(|e| record(|m| m.record_send_failure(e.category())))?;
        logger.log_confirmation(executed.digest.as_str(), status.is_success(), latency_ms);

        if let ExecutionStatus::Failure { error } = &status {
            let err = TransferError::Confirmation {
                digest: executed.digest.to_string(),
                reason: error.clone(),
            };
            record(|m| m.record_send_failure(err.category()));
            return Err(err);
        }

        record(|m| m.sends_confirmed.inc());

        Ok(SendReceipt {
            digest: executed.digest,
            status,
            summary: output.summary,
            trace,
        })
    }

    /// Wait for a submitted transfer to reach a terminal status
    ///
    /// A confirmation timeout becomes `Confirmation`; other ledger errors
    /// pass through as `Ledger`.
    pub async fn confirm(&self, digest: &TransactionDigest) -> TransferResult<ExecutionStatus> {
        match self.ledger.await_confirmation(digest).await {
            Ok(status) => Ok(status),
            Err(LedgerError::ConfirmationTimeout { waited_ms, .. }) => {
                Err(TransferError::Confirmation {
                    digest: digest.to_string(),
                    reason: format!("not confirmed after {}ms", waited_ms),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Replay the plan and check that no value is created, lost or stranded
fn verify_conservation(plan: &TransferPlan, coins: &[CoinObject]) -> TransferResult<()> {
    let summary = &plan.summary;
    let relevant: Vec<CoinObject> = coins
        .iter()
        .filter(|c| c.coin_type == summary.coin_type)
        .cloned()
        .collect();
    let report = simulate_transfer(&plan.operation, &relevant)?;

    if report.sent != summary.amount {
        return Err(TransferError::internal(format!(
            "simulation sent {} but {} was requested",
            report.sent, summary.amount
        )));
    }
    if &report.sent + &report.retained != total_balance(&relevant) {
        return Err(TransferError::internal(format!(
            "value not conserved: sent {} + retained {} != total {}",
            report.sent, report.retained, summary.total
        )));
    }
    if summary.whole_object && report.zero_value_objects > 0 {
        return Err(TransferError::internal(
            "send-all left a zero-value coin with the sender",
        ));
    }
    Ok(())
}
