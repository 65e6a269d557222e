//! Collaborator trait contracts for the completion orchestrator.
//!
//! The orchestrator never builds, signs, or verifies anything itself: chain
//! submission and attestation retrieval sit behind these traits so production
//! wires in real clients while tests use the fakes in [`crate::testing`] to
//! drive timeouts, transient failures, and state progressions without a
//! network.

use async_trait::async_trait;
use std::time::{Duration, Instant};

use crate::attestation::AttestationFetch;
use crate::error::Result;

/// Trait for on-chain transaction submission on both ends of the bridge.
///
/// Implementations own transaction construction, signing, fee handling, and
/// confirmation; the orchestrator only cares about the resulting transaction
/// identifiers.
///
/// # Test Scenarios
///
/// Implementing this trait with fakes enables testing:
/// - Source-chain submission failure (no record must be created)
/// - Destination-chain claim failure (record must stay retryable)
/// - "Attestation already consumed" claim errors
/// - Counting claim submissions to prove idempotency
#[async_trait]
pub trait ChainExecutor: Send + Sync {
    /// Submits the token transfer on the source chain.
    ///
    /// Returns the confirmed source-chain transaction identifier.
    async fn submit_transfer(&self, token_address: &str, amount: &str) -> Result<String>;

    /// Submits the claim on the destination chain, redeeming the attestation.
    ///
    /// Returns the destination-chain transaction identifier. An attestation is
    /// single-use on the destination chain; a second submission of the same
    /// bytes fails with whatever "already consumed" error the chain reports.
    async fn submit_claim(&self, attestation: &[u8]) -> Result<String>;
}

/// Trait for retrieving attestations from the guardian network.
///
/// Called repeatedly by the poller until the attestation becomes ready.
/// Rate- and latency-unpredictable; transport failures are transient and
/// never fail a transaction record.
#[async_trait]
pub trait AttestationGateway: Send + Sync {
    /// Asks whether a signed attestation exists for the given source
    /// transaction, returning it when available.
    async fn fetch(&self, source_tx_id: &str) -> Result<AttestationFetch>;
}

/// Trait for time-based operations.
///
/// Abstracts sleeping and time queries so tests can fast-forward through the
/// poll cadence and the ~20 minute timeout window without actually waiting.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Asynchronously sleeps for the given duration.
    async fn sleep(&self, duration: Duration);

    /// Returns the current instant in time.
    fn now(&self) -> Instant;
}
