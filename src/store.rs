//! Sled-backed entity store.
//!
//! Entity ids carry their collection prefix, so the id is the key and a
//! prefix scan is a collection listing. Commands stage every write into one
//! `sled::Batch` and apply it in a single call; sled applies a batch
//! atomically, which is what keeps cross-entity side effects consistent.

use std::sync::Arc;

use crate::error::{StoreError, WorkflowError};

pub const TRUCKS: &str = "truck_";
pub const DRIVERS: &str = "drv_";
pub const CLIENTS: &str = "client_";
pub const TRIPS: &str = "trip_";
pub const SUBMISSIONS: &str = "doc_";
pub const REQUESTS: &str = "req_";
pub const INVOICES: &str = "inv_";

#[derive(Clone)]
pub struct Store {
    db: Arc<sled::Db>,
}

impl Store {
    pub fn new(db: Arc<sled::Db>) -> Self {
        Self { db }
    }

    pub fn fetch<T>(&self, id: &str) -> Result<Option<T>, StoreError>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
    {
        match self.db.get(id.as_bytes()).map_err(StoreError::from)? {
            Some(raw) => Ok(Some(minicbor::decode(&raw)?)),
            None => Ok(None),
        }
    }

    /// Fetch an entity that must exist for the command to make sense.
    pub fn load<T>(&self, id: &str) -> Result<T, WorkflowError>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
    {
        self.fetch(id)?.ok_or_else(|| WorkflowError::NotFound {
            id: id.to_owned(),
        })
    }

    pub fn scan<T>(&self, prefix: &str) -> Result<Vec<T>, StoreError>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
    {
        let mut items = Vec::new();
        for entry in self.db.scan_prefix(prefix.as_bytes()) {
            let (_, raw) = entry.map_err(StoreError::from)?;
            items.push(minicbor::decode(&raw)?);
        }
        Ok(items)
    }

    pub fn apply(&self, batch: sled::Batch) -> Result<(), StoreError> {
        self.db.apply_batch(batch).map_err(StoreError::from)
    }
}

/// Stage an encodable entity into a batch under its own id.
pub fn stage<T: minicbor::Encode<()>>(
    batch: &mut sled::Batch,
    id: &str,
    value: &T,
) -> Result<(), StoreError> {
    batch.insert(id.as_bytes(), minicbor::to_vec(value)?);
    Ok(())
}
