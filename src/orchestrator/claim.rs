//! The idempotent destination-chain claim executor.
//!
//! One implementation shared by the automatic post-poll path, the operator
//! claim call, and the recovery sweep, so the idempotency and
//! state-transition rules are enforced uniformly.

use std::sync::Arc;

use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use super::Orchestrator;
use crate::error::{BridgeError, Result};
use crate::spans;
use crate::store::TransactionStore;
use crate::traits::{AttestationGateway, ChainExecutor, Clock};
use crate::transaction::{BridgeTxStatus, TransactionUpdate, TxFailure};

impl<C, G, S, K> Orchestrator<C, G, S, K>
where
    C: ChainExecutor + Clone + Send + Sync + 'static,
    G: AttestationGateway + Clone + Send + Sync + 'static,
    S: TransactionStore + Clone + Send + Sync + 'static,
    K: Clock + Clone + Send + Sync + 'static,
{
    /// Claims the bridged value on the destination chain.
    ///
    /// Returns the destination-chain transaction identifier on success.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::NotFound`] if no such record exists.
    /// - [`BridgeError::AlreadyClaimed`] with the previously recorded
    ///   destination id if the record is already terminal; the chain executor
    ///   is never contacted again.
    /// - [`BridgeError::AttestationNotReady`] if the attestation is still
    ///   unavailable after a one-shot fetch; retryable.
    /// - [`BridgeError::Claim`] if the destination chain rejects the claim;
    ///   the failure is recorded verbatim on the record and the status stays
    ///   `VaaReady`, so the claim can be retried.
    pub async fn claim(&self, id: Uuid) -> Result<String> {
        // Claims for the same id serialize here; a racing caller observes the
        // winner's `Claimed` status instead of issuing a second submission.
        let lock = self.claim_lock(id);

        let span = spans::claim(id);
        let outcome = async {
            let _in_flight = lock.lock().await;
            let tx = self.store.get(&id)?;

            if tx.status == BridgeTxStatus::Claimed {
                let dest_tx_id = tx.dest_tx_id.clone().unwrap_or_default();
                debug!(dest_tx_id = %dest_tx_id, event = "claim_rejected_already_claimed");
                return Err(BridgeError::AlreadyClaimed { dest_tx_id });
            }

            let attestation = match tx.attestation.clone() {
                Some(bytes) => bytes,
                None => self.fetch_attestation_for_claim(&tx.source_tx_id, id).await?,
            };

            match self.chain.submit_claim(&attestation).await {
                Ok(dest_tx_id) => {
                    self.store.update(
                        &id,
                        TransactionUpdate {
                            status: Some(BridgeTxStatus::Claimed),
                            dest_tx_id: Some(dest_tx_id.clone()),
                            failure: Some(None),
                            ..Default::default()
                        },
                    )?;
                    info!(dest_tx_id = %dest_tx_id, event = "claim_confirmed");
                    Ok(dest_tx_id)
                }
                Err(e) => {
                    let reason = match e {
                        BridgeError::Claim { reason } => reason,
                        other => other.to_string(),
                    };
                    let repeated = matches!(
                        &tx.last_failure,
                        Some(TxFailure::Claim { reason: prev }) if *prev == reason
                    );
                    if repeated {
                        // The same claim failing twice with the same reason
                        // usually means the attestation was consumed
                        // out-of-band; an operator has to reconcile.
                        warn!(reason = %reason, event = "claim_failure_repeated");
                    } else {
                        error!(reason = %reason, event = "claim_failed");
                    }
                    spans::record_error_with_context("ClaimFailed", &reason, None);

                    self.store.update(
                        &id,
                        TransactionUpdate::failure(TxFailure::Claim {
                            reason: reason.clone(),
                        }),
                    )?;
                    Err(BridgeError::Claim { reason })
                }
            }
        }
        .instrument(span)
        .await;

        // Once the record is terminal its lock entry has no further use.
        if matches!(&outcome, Ok(_) | Err(BridgeError::AlreadyClaimed { .. })) {
            self.release_claim_lock(id, &lock);
        }
        outcome
    }

    /// One-shot attestation fetch for a claim on a record that has no cached
    /// bytes yet. Persists the bytes and `VaaReady` when the gateway has
    /// them; otherwise the claim fails as retryable.
    async fn fetch_attestation_for_claim(&self, source_tx_id: &str, id: Uuid) -> Result<Vec<u8>> {
        let fetch = match self.gateway.fetch(source_tx_id).await {
            Ok(fetch) => fetch,
            Err(e) => {
                debug!(error = %e, event = "claim_attestation_fetch_failed");
                return Err(BridgeError::AttestationNotReady);
            }
        };

        let ready_bytes = if fetch.is_ready() { fetch.bytes } else { None };
        match ready_bytes {
            Some(bytes) => {
                let bytes = bytes.to_vec();
                self.store.update(
                    &id,
                    TransactionUpdate {
                        status: Some(BridgeTxStatus::VaaReady),
                        attestation: Some(bytes.clone()),
                        ..Default::default()
                    },
                )?;
                Ok(bytes)
            }
            None => Err(BridgeError::AttestationNotReady),
        }
    }

    fn claim_lock(&self, id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        self.claim_locks.lock().entry(id).or_default().clone()
    }

    /// Drops the lock entry for a finished claim unless another caller still
    /// holds a handle to it (map entry + our handle account for two).
    fn release_claim_lock(&self, id: Uuid, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.claim_locks.lock();
        if Arc::strong_count(lock) == 2 {
            locks.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::testing::{FakeAttestationGateway, FakeChainExecutor, FakeClock};
    use crate::transaction::{BridgeTxKind, NewTransaction};

    fn orchestrator_with_store() -> (
        Orchestrator<FakeChainExecutor, FakeAttestationGateway, InMemoryStore, FakeClock>,
        InMemoryStore,
    ) {
        let store = InMemoryStore::new();
        let orchestrator = Orchestrator::builder()
            .chain(FakeChainExecutor::new())
            .gateway(FakeAttestationGateway::new())
            .store(store.clone())
            .clock(FakeClock::new())
            .build();
        (orchestrator, store)
    }

    fn vaa_ready_record(store: &InMemoryStore) -> Uuid {
        let (tx, _) = store
            .create(NewTransaction {
                kind: BridgeTxKind::Transfer,
                source_tx_id: "0xAAA".into(),
                token_address: "0xT0KEN".into(),
                amount: "100".into(),
                status: BridgeTxStatus::VaaReady,
            })
            .unwrap();
        store
            .update(
                &tx.id,
                TransactionUpdate {
                    attestation: Some(vec![0xbe, 0xef]),
                    ..Default::default()
                },
            )
            .unwrap();
        tx.id
    }

    #[tokio::test]
    async fn test_claim_lock_pruned_once_terminal() {
        let (orchestrator, store) = orchestrator_with_store();
        let id = vaa_ready_record(&store);

        orchestrator.claim(id).await.unwrap();
        assert!(orchestrator.claim_locks.lock().is_empty());

        // The already-claimed path prunes too.
        let err = orchestrator.claim(id).await.unwrap_err();
        assert!(matches!(err, BridgeError::AlreadyClaimed { .. }));
        assert!(orchestrator.claim_locks.lock().is_empty());
    }

    #[tokio::test]
    async fn test_claim_lock_kept_for_retryable_failure() {
        let (orchestrator, store) = orchestrator_with_store();
        let id = vaa_ready_record(&store);
        orchestrator.chain.push_claim_failure("out of gas");

        let err = orchestrator.claim(id).await.unwrap_err();
        assert!(matches!(err, BridgeError::Claim { .. }));
        assert_eq!(orchestrator.claim_locks.lock().len(), 1);
    }
}
