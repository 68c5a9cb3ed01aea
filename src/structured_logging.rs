//! Structured logging for transfer pipeline events

use crate::observability::TraceContext;

/// Structured logger for transfer pipeline events
///
/// Every event carries the correlation id of the build it belongs to so a
/// single transfer can be followed from intent to confirmation.
#[derive(Debug, Clone)]
pub struct TransferLogger {
    context_id: String,
}

impl TransferLogger {
    pub fn new(context_id: impl Into<String>) -> Self {
        Self {
            context_id: context_id.into(),
        }
    }

    pub fn for_trace(trace: &TraceContext) -> Self {
        Self::new(trace.correlation_id().as_str())
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn log_build_attempt(&self, coin_type: &str, send_all: bool) {
        tracing::info!(
            context_id = %self.context_id,
            coin_type = %coin_type,
            send_all = %send_all,
            "Building transfer"
        );
    }

    pub fn log_coins_collected(&self, coin_type: &str, coins: usize, pages: usize) {
        tracing::debug!(
            context_id = %self.context_id,
            coin_type = %coin_type,
            coins = %coins,
            pages = %pages,
            "Coins collected"
        );
    }

    pub fn log_plan(&self, total: &str, amount: &str, merged: usize, split: bool) {
        tracing::debug!(
            context_id = %self.context_id,
            total = %total,
            amount = %amount,
            merged = %merged,
            split = %split,
            "Transfer planned"
        );
    }

    pub fn log_build_success(&self, digest: &str, latency_ms: u64) {
        tracing::info!(
            context_id = %self.context_id,
            digest = %digest,
            latency_ms = %latency_ms,
            "Transfer built"
        );
    }

    pub fn log_build_failure(&self, category: &str, error: &str, latency_ms: u64) {
        tracing::warn!(
            context_id = %self.context_id,
            category = %category,
            error = %error,
            latency_ms = %latency_ms,
            "Transfer build failed"
        );
    }

    pub fn log_submitted(&self, digest: &str, chain: &str) {
        tracing::info!(
            context_id = %self.context_id,
            digest = %digest,
            chain = %chain,
            "Transfer submitted"
        );
    }

    pub fn log_confirmation(&self, digest: &str, success: bool, latency_ms: u64) {
        if success {
            tracing::info!(
                context_id = %self.context_id,
                digest = %digest,
                latency_ms = %latency_ms,
                "Transfer confirmed"
            );
        } else {
            tracing::warn!(
                context_id = %self.context_id,
                digest = %digest,
                latency_ms = %latency_ms,
                "Transfer failed on ledger"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_follows_trace() {
        let trace = TraceContext::new("build_transfer");
        let logger = TransferLogger::for_trace(&trace);
        assert_eq!(logger.context_id(), trace.correlation_id().as_str());

        // Events must not panic without a subscriber installed
        logger.log_build_attempt("0x2::iota::IOTA", true);
        logger.log_build_failure("no_funds", "No available coins", 3);
    }
}
