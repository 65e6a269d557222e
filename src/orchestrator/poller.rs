//! Attestation polling: one bounded, sequential poll loop per transaction.

use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use super::Orchestrator;
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
    /// Spawns the poll loop for a transaction unless one is already running.
    ///
    /// The active set keys tasks by transaction id, so at most one
    /// poll-or-claim chain is in flight per record at any time.
    pub fn arm_poller(&self, id: Uuid) {
        {
            let mut active = self.active_polls.lock();
            if !active.insert(id) {
                debug!(transaction_id = %id, event = "poller_already_armed");
                return;
            }
        }

        let this = self.clone();
        tokio::spawn(async move {
            this.run_poll_loop(id).await;
            this.active_polls.lock().remove(&id);
        });
    }

    /// Sequential "wait, call, decide" chain for one transaction. Ends by
    /// handing off to the claim executor, by exhausting the attempt budget,
    /// or by finding nothing left to do.
    async fn run_poll_loop(&self, id: Uuid) {
        let tx = match self.store.get(&id) {
            Ok(tx) => tx,
            Err(e) => {
                error!(transaction_id = %id, error = %e, event = "poll_load_failed");
                return;
            }
        };

        if tx.status.is_terminal() {
            debug!(transaction_id = %id, event = "poll_skipped_terminal");
            return;
        }

        // Attestation already cached (e.g. a crash between fetch and claim):
        // skip straight to the claim.
        if tx.has_attestation() {
            self.claim_and_log(id).await;
            return;
        }

        let max_attempts = self.polling.max_attempts;
        let interval = self.polling.poll_interval();
        let span = spans::poll_attestation(
            id,
            &tx.source_tx_id,
            max_attempts,
            self.polling.poll_interval_secs,
        );

        async {
            info!(event = "attestation_polling_started");

            for attempt in 1..=max_attempts {
                let fetched = self
                    .gateway
                    .fetch(&tx.source_tx_id)
                    .instrument(spans::fetch_attestation(&tx.source_tx_id, attempt))
                    .await;

                match fetched {
                    Ok(fetch) if fetch.is_ready() => match fetch.bytes {
                        Some(bytes) => {
                            let updated = match self.store.update(
                                &id,
                                TransactionUpdate {
                                    status: Some(BridgeTxStatus::VaaReady),
                                    attestation: Some(bytes.to_vec()),
                                    ..Default::default()
                                },
                            ) {
                                Ok(updated) => updated,
                                Err(e) => {
                                    error!(error = %e, event = "attestation_persist_failed");
                                    return;
                                }
                            };
                            // A manual claim may have completed while this
                            // loop slept; the record is done, not claimable.
                            if updated.status.is_terminal() {
                                debug!(attempt = attempt, event = "attestation_ready_after_claim");
                                return;
                            }
                            info!(
                                attempt = attempt,
                                attestation_length_bytes = bytes.len(),
                                event = "attestation_ready"
                            );
                            self.claim_and_log(id).await;
                            return;
                        }
                        // Ready with no bytes is a malformed gateway answer;
                        // treated like pending.
                        None => warn!(attempt = attempt, event = "attestation_ready_missing_bytes"),
                    },
                    Ok(_) => debug!(attempt = attempt, event = "attestation_pending"),
                    Err(e) => debug!(
                        attempt = attempt,
                        error = %e,
                        event = "attestation_fetch_transient_error"
                    ),
                }

                // No wait after the final attempt; the timeout is recorded
                // immediately.
                if attempt < max_attempts {
                    self.clock.sleep(interval).await;
                }
            }

            spans::record_error_with_context(
                "AttestationTimeout",
                &format!("attestation polling timed out after {max_attempts} attempts"),
                Some("Record left claimable via the manual claim path"),
            );
            warn!(
                total_duration_secs = self.polling.total_timeout_secs(),
                event = "attestation_polling_timed_out"
            );

            // The status is deliberately left at its pre-timeout value so the
            // record is not falsely marked closed.
            if let Err(e) = self.store.update(
                &id,
                TransactionUpdate::failure(TxFailure::Timeout {
                    attempts: max_attempts,
                }),
            ) {
                error!(error = %e, event = "timeout_persist_failed");
            }
        }
        .instrument(span)
        .await;
    }

    /// Claims after a successful poll; failure is recorded on the record by
    /// the claim executor, so it is only logged here.
    pub(super) async fn claim_and_log(&self, id: Uuid) {
        match self.claim(id).await {
            Ok(dest_tx_id) => {
                info!(transaction_id = %id, dest_tx_id = %dest_tx_id, event = "auto_claim_succeeded");
            }
            Err(e) => {
                warn!(transaction_id = %id, error = %e, event = "auto_claim_failed");
            }
        }
    }
}
