//! The cross-chain transfer completion orchestrator.
//!
//! Owns the full lifecycle of a bridge transaction: submit the transfer on
//! the source chain, poll the attestation gateway until the VAA is ready,
//! claim on the destination chain, and recover any in-flight work after a
//! process restart. All chain and gateway interaction goes through the
//! collaborator traits in [`crate::traits`]; the transaction store is the
//! sole source of truth.

mod claim;
mod poller;
mod recovery;

pub use recovery::RecoveryReport;

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use bon::Builder;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::PollingConfig;
use crate::error::{BridgeError, Result};
use crate::spans;
use crate::store::TransactionStore;
use crate::traits::{AttestationGateway, ChainExecutor, Clock};
use crate::transaction::{
    BridgeTxKind, BridgeTxStatus, NewTransaction, TransactionUpdate, TransactionView,
};
use crate::attestation::AttestationFetch;

/// Result of initiating a transfer. Returned as soon as the source-chain
/// submission confirms; the bridge completes asynchronously.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub transaction_id: Uuid,
    pub source_tx_id: String,
}

/// Result of registering an out-of-band source transaction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub transaction_id: Uuid,
    /// True when a record for this source transaction already existed.
    pub existing: bool,
}

/// Completion orchestrator for VAA-based token bridging.
///
/// One lightweight task per in-flight transaction; no global lock. The store
/// is the only shared mutable state and every mutation is scoped to a single
/// record.
///
/// # Example
///
/// ```rust,no_run
/// use vaa_bridge::{InMemoryStore, Orchestrator, PollingConfig, TokioClock};
/// use vaa_bridge::testing::{FakeAttestationGateway, FakeChainExecutor};
///
/// # async fn example() -> Result<(), vaa_bridge::BridgeError> {
/// let orchestrator = Orchestrator::builder()
///     .chain(FakeChainExecutor::new())
///     .gateway(FakeAttestationGateway::new())
///     .store(InMemoryStore::new())
///     .clock(TokioClock::new())
///     .build();
///
/// orchestrator.recover_pending().await?;
/// let receipt = orchestrator.initiate_transfer("0xT0KEN", "100").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Builder, Clone, Debug)]
pub struct Orchestrator<C, G, S, K> {
    chain: C,
    gateway: G,
    store: S,
    clock: K,
    #[builder(default)]
    polling: PollingConfig,
    #[builder(skip)]
    active_polls: Arc<parking_lot::Mutex<HashSet<Uuid>>>,
    #[builder(skip)]
    claim_locks: Arc<parking_lot::Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

impl<C, G, S, K> Orchestrator<C, G, S, K>
where
    C: ChainExecutor + Clone + Send + Sync + 'static,
    G: AttestationGateway + Clone + Send + Sync + 'static,
    S: TransactionStore + Clone + Send + Sync + 'static,
    K: Clock + Clone + Send + Sync + 'static,
{
    /// Returns the polling configuration in effect.
    pub fn polling_config(&self) -> PollingConfig {
        self.polling
    }

    /// Submits a token transfer on the source chain and arms the attestation
    /// poller for it.
    ///
    /// Returns immediately after the source-chain submission confirms; the
    /// attestation wait and the destination-chain claim happen on a background
    /// task. On source-chain failure no record is created and the error
    /// carries the `transfer` phase.
    pub async fn initiate_transfer(
        &self,
        token_address: &str,
        amount: &str,
    ) -> Result<TransferReceipt> {
        let span = spans::initiate_transfer(token_address, amount);
        let _guard = span.enter();

        validate_amount(amount)?;

        let source_tx_id = match self.chain.submit_transfer(token_address, amount).await {
            Ok(source_tx_id) => source_tx_id,
            Err(e) => {
                let reason = match e {
                    BridgeError::Transfer { reason } => reason,
                    other => other.to_string(),
                };
                spans::record_error_with_context(
                    "TransferFailed",
                    &reason,
                    Some("Source chain submission failed; no record created"),
                );
                return Err(BridgeError::Transfer { reason });
            }
        };

        let (tx, existing) = self.store.create(NewTransaction {
            kind: BridgeTxKind::Transfer,
            source_tx_id: source_tx_id.clone(),
            token_address: token_address.to_string(),
            amount: amount.to_string(),
            status: BridgeTxStatus::Polling,
        })?;

        info!(
            transaction_id = %tx.id,
            source_tx_id = %source_tx_id,
            existing = existing,
            event = "transfer_initiated"
        );

        self.arm_poller(tx.id);

        Ok(TransferReceipt {
            transaction_id: tx.id,
            source_tx_id,
        })
    }

    /// Registers a source-chain transfer that happened out of band.
    ///
    /// Idempotent on `source_tx_id`: a record that already exists is returned
    /// with `existing = true` instead of creating a duplicate. The record is
    /// created at `Submitted`; it is picked up by the opportunistic refresh in
    /// [`list_pending`](Self::list_pending) or by the next recovery sweep.
    pub async fn register_source_tx(
        &self,
        source_tx_id: &str,
        amount: &str,
        kind: BridgeTxKind,
    ) -> Result<Registration> {
        if source_tx_id.trim().is_empty() {
            return Err(BridgeError::InvalidSourceTx);
        }
        validate_amount(amount)?;

        let (tx, existing) = self.store.create(NewTransaction {
            kind,
            source_tx_id: source_tx_id.to_string(),
            token_address: String::new(),
            amount: amount.to_string(),
            status: BridgeTxStatus::Submitted,
        })?;

        info!(
            transaction_id = %tx.id,
            source_tx_id = %source_tx_id,
            existing = existing,
            event = "source_tx_registered"
        );

        Ok(Registration {
            transaction_id: tx.id,
            existing,
        })
    }

    /// Loads one transaction as its outward view.
    pub fn get_transaction(&self, id: Uuid) -> Result<TransactionView> {
        Ok(TransactionView::from(&self.store.get(&id)?))
    }

    /// Lists every non-terminal transaction, newest-first.
    ///
    /// Records still at `Submitted` get one opportunistic, synchronous
    /// attestation check and are upgraded to `VaaReady` in place when the
    /// gateway already has the VAA; gateway errors on this path are swallowed
    /// and do not affect the listing.
    pub async fn list_pending(&self) -> Result<Vec<TransactionView>> {
        let pending = self.store.list_by_status(&BridgeTxStatus::PENDING)?;

        let mut views = Vec::with_capacity(pending.len());
        for tx in pending {
            let tx = if tx.status == BridgeTxStatus::Submitted && !tx.has_attestation() {
                match self.gateway.fetch(&tx.source_tx_id).await {
                    Ok(fetch) if fetch.is_ready() => match fetch.bytes {
                        Some(bytes) => self.store.update(
                            &tx.id,
                            TransactionUpdate {
                                status: Some(BridgeTxStatus::VaaReady),
                                attestation: Some(bytes.to_vec()),
                                ..Default::default()
                            },
                        )?,
                        None => tx,
                    },
                    Ok(_) => tx,
                    Err(e) => {
                        debug!(
                            transaction_id = %tx.id,
                            error = %e,
                            event = "opportunistic_refresh_failed"
                        );
                        tx
                    }
                }
            } else {
                tx
            };
            views.push(TransactionView::from(&tx));
        }
        Ok(views)
    }

    /// Diagnostic fetch of the attestation for a source transaction id.
    /// Does not touch any record.
    pub async fn fetch_attestation(&self, source_tx_id: &str) -> Result<AttestationFetch> {
        if source_tx_id.trim().is_empty() {
            return Err(BridgeError::InvalidSourceTx);
        }
        self.gateway.fetch(source_tx_id).await
    }
}

/// Validates a human-readable decimal amount without going through floating
/// point.
fn validate_amount(amount: &str) -> Result<()> {
    if amount.trim().is_empty() {
        return Err(BridgeError::InvalidAmount {
            reason: "amount must not be empty".to_string(),
        });
    }
    let parsed = BigDecimal::from_str(amount.trim()).map_err(|e| BridgeError::InvalidAmount {
        reason: e.to_string(),
    })?;
    if parsed <= BigDecimal::from(0) {
        return Err(BridgeError::InvalidAmount {
            reason: "amount must be positive".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("100")]
    #[case("0.000001")]
    #[case(" 42.5 ")]
    #[case("123456789012345678901234567890.123456789")]
    fn test_valid_amounts(#[case] amount: &str) {
        assert!(validate_amount(amount).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("abc")]
    #[case("1.2.3")]
    #[case("-5")]
    #[case("0")]
    fn test_invalid_amounts(#[case] amount: &str) {
        assert!(matches!(
            validate_amount(amount),
            Err(BridgeError::InvalidAmount { .. })
        ));
    }
}
