use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use super::TransactionStore;
use crate::error::{BridgeError, Result};
use crate::transaction::{BridgeTransaction, BridgeTxStatus, NewTransaction, TransactionUpdate};

/// In-memory transaction store.
///
/// Cheap to clone (shared behind an `Arc`). Suited to tests and to embedders
/// that provide their own durability; production deployments use
/// [`SledStore`](super::SledStore).
#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<HashMap<Uuid, BridgeTransaction>>>,
    by_source_tx: Arc<RwLock<HashMap<String, Uuid>>>,
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionStore for InMemoryStore {
    #[tracing::instrument(skip(self, new), fields(source_tx_id = %new.source_tx_id))]
    fn create(&self, new: NewTransaction) -> Result<(BridgeTransaction, bool)> {
        let mut index = self.by_source_tx.write();
        if let Some(existing_id) = index.get(&new.source_tx_id) {
            let records = self.records.read();
            let existing = records
                .get(existing_id)
                .cloned()
                .ok_or(BridgeError::NotFound { id: *existing_id })?;
            return Ok((existing, true));
        }

        let tx = BridgeTransaction::new(new);
        index.insert(tx.source_tx_id.clone(), tx.id);
        self.records.write().insert(tx.id, tx.clone());
        Ok((tx, false))
    }

    fn get(&self, id: &Uuid) -> Result<BridgeTransaction> {
        self.records
            .read()
            .get(id)
            .cloned()
            .ok_or(BridgeError::NotFound { id: *id })
    }

    fn find_by_source_tx_id(&self, source_tx_id: &str) -> Result<Option<BridgeTransaction>> {
        let index = self.by_source_tx.read();
        let Some(id) = index.get(source_tx_id) else {
            return Ok(None);
        };
        Ok(self.records.read().get(id).cloned())
    }

    #[tracing::instrument(skip(self, changes))]
    fn update(&self, id: &Uuid, changes: TransactionUpdate) -> Result<BridgeTransaction> {
        let mut records = self.records.write();
        let tx = records
            .get_mut(id)
            .ok_or(BridgeError::NotFound { id: *id })?;
        changes.apply(tx);
        Ok(tx.clone())
    }

    fn list_by_status(&self, statuses: &[BridgeTxStatus]) -> Result<Vec<BridgeTransaction>> {
        let records = self.records.read();
        let mut matched: Vec<BridgeTransaction> = records
            .values()
            .filter(|tx| statuses.contains(&tx.status))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::BridgeTxKind;

    fn new_tx(source_tx_id: &str) -> NewTransaction {
        NewTransaction {
            kind: BridgeTxKind::Transfer,
            source_tx_id: source_tx_id.into(),
            token_address: "0xT0KEN".into(),
            amount: "100".into(),
            status: BridgeTxStatus::Polling,
        }
    }

    #[test]
    fn test_create_is_idempotent_on_source_tx_id() {
        let store = InMemoryStore::new();
        let (first, existing) = store.create(new_tx("0xAAA")).unwrap();
        assert!(!existing);

        let (second, existing) = store.create(new_tx("0xAAA")).unwrap();
        assert!(existing);
        assert_eq!(first.id, second.id);

        assert_eq!(
            store
                .list_by_status(&BridgeTxStatus::PENDING)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.get(&id),
            Err(BridgeError::NotFound { id: missing }) if missing == id
        ));
    }

    #[test]
    fn test_find_by_source_tx_id() {
        let store = InMemoryStore::new();
        let (created, _) = store.create(new_tx("0xAAA")).unwrap();

        let found = store.find_by_source_tx_id("0xAAA").unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(store.find_by_source_tx_id("0xBBB").unwrap().is_none());
    }

    #[test]
    fn test_list_by_status_newest_first() {
        let store = InMemoryStore::new();
        let (a, _) = store.create(new_tx("0xAAA")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let (b, _) = store.create(new_tx("0xBBB")).unwrap();

        let listed = store.list_by_status(&[BridgeTxStatus::Polling]).unwrap();
        assert_eq!(
            listed.iter().map(|tx| tx.id).collect::<Vec<_>>(),
            vec![b.id, a.id]
        );

        store
            .update(&a.id, TransactionUpdate::status(BridgeTxStatus::Claimed))
            .unwrap();
        let listed = store.list_by_status(&[BridgeTxStatus::Polling]).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, b.id);
    }

    #[test]
    fn test_update_bumps_updated_at() {
        let store = InMemoryStore::new();
        let (tx, _) = store.create(new_tx("0xAAA")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        let updated = store
            .update(&tx.id, TransactionUpdate::status(BridgeTxStatus::VaaReady))
            .unwrap();
        assert!(updated.updated_at > tx.updated_at);
        assert_eq!(updated.created_at, tx.created_at);
    }
}
