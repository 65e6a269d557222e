use std::path::Path;

use uuid::Uuid;

use super::TransactionStore;
use crate::error::{BridgeError, Result};
use crate::transaction::{BridgeTransaction, BridgeTxStatus, NewTransaction, TransactionUpdate};

const TRANSACTIONS_TREE: &str = "transactions";
const SOURCE_TX_INDEX_TREE: &str = "source_tx_index";

/// Sled-backed transaction store.
///
/// Records live in the `transactions` tree keyed by id, JSON-encoded; the
/// `source_tx_index` tree maps `source_tx_id` to record id. Idempotent
/// creation is enforced with a compare-and-swap on the index entry, so two
/// racing creators for the same source transaction converge on one record.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore").finish()
    }
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::Config::new()
            .path(path)
            .temporary(cfg!(test))
            .use_compression(true)
            .open()?;
        Ok(Self { db })
    }

    /// Opens a throwaway store backed by a temporary sled database.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    fn decode(bytes: &[u8]) -> Result<BridgeTransaction> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn put(&self, tx: &BridgeTransaction) -> Result<()> {
        let tree = self.db.open_tree(TRANSACTIONS_TREE)?;
        tree.insert(tx.id.as_bytes(), serde_json::to_vec(tx)?)?;
        Ok(())
    }
}

impl TransactionStore for SledStore {
    #[tracing::instrument(skip(self, new), fields(source_tx_id = %new.source_tx_id))]
    fn create(&self, new: NewTransaction) -> Result<(BridgeTransaction, bool)> {
        let index = self.db.open_tree(SOURCE_TX_INDEX_TREE)?;

        let tx = BridgeTransaction::new(new);
        let claimed_slot = index.compare_and_swap(
            tx.source_tx_id.as_bytes(),
            None as Option<&[u8]>,
            Some(tx.id.as_bytes().as_slice()),
        )?;

        match claimed_slot {
            Ok(()) => {
                self.put(&tx)?;
                Ok((tx, false))
            }
            // Lost the race (or the record predates us): return the winner.
            Err(cas) => {
                let existing_id = cas
                    .current
                    .as_deref()
                    .and_then(|v| Uuid::from_slice(v).ok())
                    .ok_or(BridgeError::NotFound { id: tx.id })?;
                Ok((self.get(&existing_id)?, true))
            }
        }
    }

    fn get(&self, id: &Uuid) -> Result<BridgeTransaction> {
        let tree = self.db.open_tree(TRANSACTIONS_TREE)?;
        let bytes = tree
            .get(id.as_bytes())?
            .ok_or(BridgeError::NotFound { id: *id })?;
        Self::decode(&bytes)
    }

    fn find_by_source_tx_id(&self, source_tx_id: &str) -> Result<Option<BridgeTransaction>> {
        let index = self.db.open_tree(SOURCE_TX_INDEX_TREE)?;
        let Some(id_bytes) = index.get(source_tx_id.as_bytes())? else {
            return Ok(None);
        };
        let id = Uuid::from_slice(&id_bytes).map_err(|_| BridgeError::Corrupt {
            reason: format!("bad source tx index entry for {source_tx_id}"),
        })?;
        Ok(Some(self.get(&id)?))
    }

    #[tracing::instrument(skip(self, changes))]
    fn update(&self, id: &Uuid, changes: TransactionUpdate) -> Result<BridgeTransaction> {
        let mut tx = self.get(id)?;
        changes.apply(&mut tx);
        self.put(&tx)?;
        Ok(tx)
    }

    fn list_by_status(&self, statuses: &[BridgeTxStatus]) -> Result<Vec<BridgeTransaction>> {
        let tree = self.db.open_tree(TRANSACTIONS_TREE)?;
        let mut matched = Vec::new();
        for entry in tree.iter() {
            let (_, bytes) = entry?;
            let tx = Self::decode(&bytes)?;
            if statuses.contains(&tx.status) {
                matched.push(tx);
            }
        }
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
            status: BridgeTxStatus::Submitted,
        }
    }

    #[test]
    fn test_roundtrip_and_idempotent_create() {
        let store = SledStore::temporary().unwrap();

        let (created, existing) = store.create(new_tx("0xAAA")).unwrap();
        assert!(!existing);

        let (again, existing) = store.create(new_tx("0xAAA")).unwrap();
        assert!(existing);
        assert_eq!(created.id, again.id);

        let loaded = store.get(&created.id).unwrap();
        assert_eq!(loaded.source_tx_id, "0xAAA");
        assert_eq!(loaded.status, BridgeTxStatus::Submitted);
    }

    #[test]
    fn test_update_persists_attestation_once() {
        let store = SledStore::temporary().unwrap();
        let (tx, _) = store.create(new_tx("0xAAA")).unwrap();

        store
            .update(
                &tx.id,
                TransactionUpdate {
                    status: Some(BridgeTxStatus::VaaReady),
                    attestation: Some(vec![0xbe, 0xef]),
                    ..Default::default()
                },
            )
            .unwrap();

        let updated = store
            .update(
                &tx.id,
                TransactionUpdate {
                    attestation: Some(vec![0x11]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.attestation.as_deref(), Some(&[0xbe, 0xef][..]));
        assert_eq!(updated.status, BridgeTxStatus::VaaReady);
    }

    #[test]
    fn test_list_by_status_filters_and_orders() {
        let store = SledStore::temporary().unwrap();
        let (a, _) = store.create(new_tx("0xAAA")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let (b, _) = store.create(new_tx("0xBBB")).unwrap();

        store
            .update(&a.id, TransactionUpdate::status(BridgeTxStatus::Claimed))
            .unwrap();

        let pending = store.list_by_status(&BridgeTxStatus::PENDING).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b.id);

        let all = store
            .list_by_status(&[BridgeTxStatus::Submitted, BridgeTxStatus::Claimed])
            .unwrap();
        assert_eq!(
            all.iter().map(|tx| tx.id).collect::<Vec<_>>(),
            vec![b.id, a.id]
        );
    }
}
