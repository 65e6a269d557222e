//! Startup recovery: re-arm work for every non-terminal record.
//!
//! Poll schedules and attempt counters live only in memory, so a restart
//! during the polling window would strand a transfer forever without this
//! sweep. Run once, shortly after process start.

use serde::Serialize;
use tracing::{error, info, warn, Instrument};

use super::Orchestrator;
use crate::config::RECOVERY_STAGGER;
use crate::error::Result;
use crate::spans;
use crate::store::TransactionStore;
use crate::traits::{AttestationGateway, ChainExecutor, Clock};
use crate::transaction::{BridgeTxStatus, TransactionUpdate};

/// Summary of one recovery sweep.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryReport {
    /// Records reset to `Polling` with a freshly armed poller.
    pub rearmed: usize,
    /// `VaaReady` records claimed directly during the sweep.
    pub claimed: usize,
    /// Records whose recovery action failed; they stay queryable and are
    /// retried on the next sweep or via the manual claim path.
    pub failed: usize,
}

impl<C, G, S, K> Orchestrator<C, G, S, K>
where
    C: ChainExecutor + Clone + Send + Sync + 'static,
    G: AttestationGateway + Clone + Send + Sync + 'static,
    S: TransactionStore + Clone + Send + Sync + 'static,
    K: Clock + Clone + Send + Sync + 'static,
{
    /// Scans the store for every transaction not yet terminal and re-arms the
    /// appropriate work.
    ///
    /// `VaaReady` records (attestation known, claim missing) are claimed
    /// directly; `Submitted`/`Polling` records are reset to `Polling` and get
    /// a fresh poller, attempt counter starting over. Per-record failures are
    /// logged and do not abort the batch. A small stagger between records
    /// avoids hammering the gateway at startup.
    pub async fn recover_pending(&self) -> Result<RecoveryReport> {
        let span = spans::recover_pending();
        async {
            let pending = self.store.list_by_status(&BridgeTxStatus::PENDING)?;
            info!(count = pending.len(), event = "recovery_sweep_started");

            let mut report = RecoveryReport::default();
            for (i, tx) in pending.iter().enumerate() {
                if i > 0 {
                    self.clock.sleep(RECOVERY_STAGGER).await;
                }

                match tx.status {
                    BridgeTxStatus::VaaReady => match self.claim(tx.id).await {
                        Ok(dest_tx_id) => {
                            info!(
                                transaction_id = %tx.id,
                                dest_tx_id = %dest_tx_id,
                                event = "recovery_claim_succeeded"
                            );
                            report.claimed += 1;
                        }
                        Err(e) => {
                            warn!(
                                transaction_id = %tx.id,
                                error = %e,
                                event = "recovery_claim_failed"
                            );
                            report.failed += 1;
                        }
                    },
                    BridgeTxStatus::Submitted | BridgeTxStatus::Polling => {
                        match self
                            .store
                            .update(&tx.id, TransactionUpdate::status(BridgeTxStatus::Polling))
                        {
                            Ok(_) => {
                                self.arm_poller(tx.id);
                                report.rearmed += 1;
                            }
                            Err(e) => {
                                error!(
                                    transaction_id = %tx.id,
                                    error = %e,
                                    event = "recovery_rearm_failed"
                                );
                                report.failed += 1;
                            }
                        }
                    }
                    BridgeTxStatus::Claimed => {}
                }
            }

            info!(
                rearmed = report.rearmed,
                claimed = report.claimed,
                failed = report.failed,
                event = "recovery_sweep_finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }
}
