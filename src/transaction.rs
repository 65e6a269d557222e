//! The persistent bridge transaction entity and its outward-facing view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::attestation::AttestationBytes;

/// Lifecycle state of a bridge transaction.
///
/// Advances forward only: `Submitted`/`Polling` (awaiting attestation) →
/// `VaaReady` (attestation known) → `Claimed` (terminal). A poll timeout or a
/// failed claim leaves the status where it was and records a
/// [`TxFailure`] instead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BridgeTxStatus {
    Submitted,
    Polling,
    VaaReady,
    Claimed,
}

impl BridgeTxStatus {
    /// States with outstanding work: everything except `Claimed`.
    pub const PENDING: [BridgeTxStatus; 3] = [
        BridgeTxStatus::Submitted,
        BridgeTxStatus::Polling,
        BridgeTxStatus::VaaReady,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, BridgeTxStatus::Claimed)
    }
}

/// Kind of bridging operation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BridgeTxKind {
    #[default]
    Transfer,
}

/// Last recorded non-fatal failure on a transaction.
///
/// Never advances or regresses the status by itself; the record stays
/// queryable and manually claimable.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TxFailure {
    #[error("attestation polling timed out after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("claim failed: {reason}")]
    Claim { reason: String },

    #[error("gateway error: {reason}")]
    Gateway { reason: String },
}

/// Durable record of one bridge transaction; the sole source of truth for
/// its progress across process restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeTransaction {
    pub id: Uuid,
    pub kind: BridgeTxKind,
    /// Confirmed source-chain transaction identifier; the idempotency key.
    pub source_tx_id: String,
    pub token_address: String,
    /// Human-readable decimal quantity. Validated at the boundary, never
    /// converted to floating point.
    pub amount: String,
    pub status: BridgeTxStatus,
    /// Signed attestation, cached once fetched. Write-once.
    pub attestation: Option<AttestationBytes>,
    /// Destination-chain claim transaction identifier; present only once
    /// claimed.
    pub dest_tx_id: Option<String>,
    pub last_failure: Option<TxFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BridgeTransaction {
    pub fn new(new: NewTransaction) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind: new.kind,
            source_tx_id: new.source_tx_id,
            token_address: new.token_address,
            amount: new.amount,
            status: new.status,
            attestation: None,
            dest_tx_id: None,
            last_failure: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_attestation(&self) -> bool {
        self.attestation.is_some()
    }
}

/// Fields required to create a new record.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub kind: BridgeTxKind,
    pub source_tx_id: String,
    pub token_address: String,
    pub amount: String,
    pub status: BridgeTxStatus,
}

/// Partial mutation applied to a single record, last-write-wins.
///
/// `failure` distinguishes "leave as is" (`None`) from "clear"
/// (`Some(None)`). An already-set attestation or destination transaction id
/// is never overwritten, and a terminal status is never regressed: a poller
/// that raced a manual claim cannot reopen a `Claimed` record.
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    pub status: Option<BridgeTxStatus>,
    pub attestation: Option<AttestationBytes>,
    pub dest_tx_id: Option<String>,
    pub failure: Option<Option<TxFailure>>,
}

impl TransactionUpdate {
    pub fn status(status: BridgeTxStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn failure(failure: TxFailure) -> Self {
        Self {
            failure: Some(Some(failure)),
            ..Self::default()
        }
    }

    /// Applies this update to a record in place, bumping `updated_at`.
    pub fn apply(self, tx: &mut BridgeTransaction) {
        if let Some(status) = self.status {
            // Claimed is terminal: late status writes are dropped.
            if !tx.status.is_terminal() {
                tx.status = status;
            }
        }
        if tx.attestation.is_none() {
            if let Some(attestation) = self.attestation {
                tx.attestation = Some(attestation);
            }
        }
        if tx.dest_tx_id.is_none() {
            if let Some(dest_tx_id) = self.dest_tx_id {
                tx.dest_tx_id = Some(dest_tx_id);
            }
        }
        if let Some(failure) = self.failure {
            tx.last_failure = failure;
        }
        tx.updated_at = Utc::now();
    }
}

/// Read-only projection of a record for the query surface.
///
/// The attestation bytes are never serialized outward; callers only see
/// whether they are present.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: Uuid,
    pub status: BridgeTxStatus,
    pub source_tx_id: String,
    pub dest_tx_id: Option<String>,
    pub token_address: String,
    pub amount: String,
    pub error: Option<String>,
    pub has_attestation: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&BridgeTransaction> for TransactionView {
    fn from(tx: &BridgeTransaction) -> Self {
        Self {
            id: tx.id,
            status: tx.status,
            source_tx_id: tx.source_tx_id.clone(),
            dest_tx_id: tx.dest_tx_id.clone(),
            token_address: tx.token_address.clone(),
            amount: tx.amount.clone(),
            error: tx.last_failure.as_ref().map(|f| f.to_string()),
            has_attestation: tx.has_attestation(),
            created_at: tx.created_at,
            updated_at: tx.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BridgeTransaction {
        BridgeTransaction::new(NewTransaction {
            kind: BridgeTxKind::Transfer,
            source_tx_id: "0xAAA".into(),
            token_address: "0xT0KEN".into(),
            amount: "100".into(),
            status: BridgeTxStatus::Polling,
        })
    }

    #[test]
    fn test_update_does_not_overwrite_attestation() {
        let mut tx = sample();
        TransactionUpdate {
            attestation: Some(vec![0xbe, 0xef]),
            ..Default::default()
        }
        .apply(&mut tx);
        TransactionUpdate {
            attestation: Some(vec![0x00]),
            ..Default::default()
        }
        .apply(&mut tx);
        assert_eq!(tx.attestation.as_deref(), Some(&[0xbe, 0xef][..]));
    }

    #[test]
    fn test_update_clears_failure_explicitly() {
        let mut tx = sample();
        TransactionUpdate::failure(TxFailure::Claim {
            reason: "out of gas".into(),
        })
        .apply(&mut tx);
        assert!(tx.last_failure.is_some());

        // `failure: None` leaves it alone
        TransactionUpdate::status(BridgeTxStatus::VaaReady).apply(&mut tx);
        assert!(tx.last_failure.is_some());

        TransactionUpdate {
            failure: Some(None),
            ..Default::default()
        }
        .apply(&mut tx);
        assert!(tx.last_failure.is_none());
    }

    #[test]
    fn test_update_never_regresses_claimed() {
        let mut tx = sample();
        TransactionUpdate {
            status: Some(BridgeTxStatus::Claimed),
            dest_tx_id: Some("0xDDD".into()),
            ..Default::default()
        }
        .apply(&mut tx);

        // A poller that raced the claim writes VaaReady afterwards; both the
        // status and the destination id must survive.
        TransactionUpdate {
            status: Some(BridgeTxStatus::VaaReady),
            attestation: Some(vec![0xbe, 0xef]),
            dest_tx_id: Some("0xEEE".into()),
            ..Default::default()
        }
        .apply(&mut tx);

        assert_eq!(tx.status, BridgeTxStatus::Claimed);
        assert_eq!(tx.dest_tx_id.as_deref(), Some("0xDDD"));
    }

    #[test]
    fn test_view_hides_attestation_bytes() {
        let mut tx = sample();
        TransactionUpdate {
            attestation: Some(vec![0xbe, 0xef]),
            ..Default::default()
        }
        .apply(&mut tx);

        let view = TransactionView::from(&tx);
        assert!(view.has_attestation);

        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("\"hasAttestation\":true"));
        assert!(!json.contains("beef"));
    }

    #[test]
    fn test_failure_messages() {
        insta::assert_snapshot!(
            TxFailure::Timeout { attempts: 80 }.to_string(),
            @"attestation polling timed out after 80 attempts"
        );
        insta::assert_snapshot!(
            TxFailure::Claim { reason: "vaa already executed".into() }.to_string(),
            @"claim failed: vaa already executed"
        );
    }

    #[test]
    fn test_status_serde_names() {
        assert_eq!(
            serde_json::to_string(&BridgeTxStatus::VaaReady).unwrap(),
            "\"vaa_ready\""
        );
        assert_eq!(
            serde_json::to_string(&BridgeTxStatus::Submitted).unwrap(),
            "\"submitted\""
        );
    }
}
