//! Span helpers for bridge orchestration operations.
//!
//! Orthogonal span instrumentation: static span names, structured attributes,
//! kept separate from the business logic. Used internally by the
//! [`Orchestrator`](crate::Orchestrator) and exposed for embedders that need
//! custom instrumentation.

use tracing::Span;
use uuid::Uuid;

/// Create span for initiating a source-chain transfer.
#[inline]
pub fn initiate_transfer(token_address: &str, amount: &str) -> Span {
    tracing::info_span!(
        "vaa_bridge.initiate_transfer",
        token_address = %token_address,
        amount = %amount,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Create span for the bounded attestation poll loop of one transaction.
///
/// Children: `vaa_bridge.fetch_attestation` (one per attempt).
#[inline]
pub fn poll_attestation(
    id: Uuid,
    source_tx_id: &str,
    max_attempts: u32,
    poll_interval_secs: u64,
) -> Span {
    tracing::info_span!(
        "vaa_bridge.poll_attestation",
        transaction_id = %id,
        source_tx_id = %source_tx_id,
        max_attempts = max_attempts,
        poll_interval_secs = poll_interval_secs,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Create span for a single gateway fetch attempt.
#[inline]
pub fn fetch_attestation(source_tx_id: &str, attempt: u32) -> Span {
    tracing::debug_span!(
        "vaa_bridge.fetch_attestation",
        source_tx_id = %source_tx_id,
        attempt = attempt,
    )
}

/// Create span for a destination-chain claim attempt.
#[inline]
pub fn claim(id: Uuid) -> Span {
    tracing::info_span!(
        "vaa_bridge.claim",
        transaction_id = %id,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.context = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Create span for the startup recovery sweep.
#[inline]
pub fn recover_pending() -> Span {
    tracing::info_span!(
        "vaa_bridge.recover_pending",
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Record an error on the current span with structured attributes.
pub fn record_error_with_context(
    error_type: &str,
    error_message: &str,
    additional_context: Option<&str>,
) {
    let current_span = Span::current();
    current_span.record("error.type", error_type);
    current_span.record("error.message", error_message);
    current_span.record("otel.status_code", "ERROR");

    if let Some(context) = additional_context {
        current_span.record("error.context", context);
    }
}
