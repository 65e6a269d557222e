//! Durable storage for bridge transactions.
//!
//! The store is the sole source of truth for transaction progress and the
//! only shared mutable state in the orchestrator. All mutations are
//! single-row, last-write-wins; state-machine rules are enforced by the
//! executors, not here, with one exception: an already-set attestation is
//! never overwritten.

use uuid::Uuid;

use crate::error::Result;
use crate::transaction::{BridgeTransaction, BridgeTxStatus, NewTransaction, TransactionUpdate};

mod mem;
mod sled;

pub use self::sled::SledStore;
pub use mem::InMemoryStore;

/// Contract for the durable record of every bridge transaction.
///
/// Records are never deleted; a failed or stuck record stays queryable
/// indefinitely for manual intervention.
pub trait TransactionStore: Send + Sync {
    /// Creates a record, idempotent on `source_tx_id`: if a record with the
    /// same source transaction already exists, the existing record is
    /// returned and the second element is `true`.
    fn create(&self, new: NewTransaction) -> Result<(BridgeTransaction, bool)>;

    /// Loads a record by id; `NotFound` if absent.
    fn get(&self, id: &Uuid) -> Result<BridgeTransaction>;

    /// Looks a record up by its source transaction identifier.
    fn find_by_source_tx_id(&self, source_tx_id: &str) -> Result<Option<BridgeTransaction>>;

    /// Applies a partial mutation to one record and returns the result.
    fn update(&self, id: &Uuid, changes: TransactionUpdate) -> Result<BridgeTransaction>;

    /// Lists records whose status is in `statuses`, newest-first.
    fn list_by_status(&self, statuses: &[BridgeTxStatus]) -> Result<Vec<BridgeTransaction>>;
}
