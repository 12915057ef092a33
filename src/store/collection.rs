/// Typed access to one JSON document
use crate::{
    error::{ApiError, ApiResult},
    metrics,
    store::{DocumentBackend, Record},
};
use sha2::{Digest, Sha256};
use std::{marker::PhantomData, sync::Arc, time::Instant};
use tokio::sync::Mutex;

/// Records plus the entity tag of the document they were read from
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub records: Vec<T>,
    pub etag: String,
}

/// All records of one type, stored as a single JSON array
///
/// Read-modify-write cycles hold `write_lock` from the read until the
/// document is written back, so concurrent writers in this process never
/// overwrite each other's changes.
pub struct Collection<T: Record> {
    backend: Arc<dyn DocumentBackend>,
    write_lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> Collection<T> {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    async fn read_raw(&self) -> ApiResult<Vec<u8>> {
        Ok(self
            .backend
            .read(T::DOCUMENT)
            .await?
            .unwrap_or_else(|| b"[]".to_vec()))
    }

    fn decode(bytes: &[u8]) -> ApiResult<Vec<T>> {
        serde_json::from_slice(bytes).map_err(|e| {
            ApiError::Internal(format!("Corrupt document {}.json: {}", T::DOCUMENT, e))
        })
    }

    fn etag(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    async fn persist(&self, records: &[T]) -> ApiResult<()> {
        let start = Instant::now();
        let data = serde_json::to_vec_pretty(records)?;
        self.backend.write(T::DOCUMENT, data).await?;
        metrics::record_document_write(T::DOCUMENT, start.elapsed().as_secs_f64());
        tracing::debug!("Wrote {} {} records", records.len(), T::DOCUMENT);
        Ok(())
    }

    /// Load every record
    pub async fn all(&self) -> ApiResult<Vec<T>> {
        let bytes = self.read_raw().await?;
        Self::decode(&bytes)
    }

    /// Load every record together with the document's entity tag
    pub async fn snapshot(&self) -> ApiResult<Snapshot<T>> {
        let bytes = self.read_raw().await?;
        Ok(Snapshot {
            records: Self::decode(&bytes)?,
            etag: Self::etag(&bytes),
        })
    }

    /// Number of stored records
    pub async fn count(&self) -> ApiResult<usize> {
        Ok(self.all().await?.len())
    }

    /// Fetch one record by id
    pub async fn get(&self, id: &str) -> ApiResult<T> {
        self.all()
            .await?
            .into_iter()
            .find(|r| r.id() == id)
            .ok_or_else(|| ApiError::NotFound(format!("{} not found", T::KIND)))
    }

    /// First record matching a predicate
    pub async fn find<P>(&self, predicate: P) -> ApiResult<Option<T>>
    where
        P: Fn(&T) -> bool,
    {
        Ok(self.all().await?.into_iter().find(|r| predicate(r)))
    }

    /// Run a read-modify-write cycle over the whole document.
    ///
    /// The document is written back only when `f` succeeds.
    pub async fn update<R, F>(&self, f: F) -> ApiResult<R>
    where
        F: FnOnce(&mut Vec<T>) -> ApiResult<R>,
    {
        let _guard = self.write_lock.lock().await;
        let mut records = self.all().await?;
        let result = f(&mut records)?;
        self.persist(&records).await?;
        Ok(result)
    }

    /// Append a record
    pub async fn insert(&self, record: T) -> ApiResult<T> {
        self.update(|records| {
            if records.iter().any(|r| r.id() == record.id()) {
                return Err(ApiError::Conflict(format!(
                    "{} {} already exists",
                    T::KIND,
                    record.id()
                )));
            }
            records.push(record.clone());
            Ok(record)
        })
        .await
    }

    /// Apply `f` to the record with `id`; unknown ids leave the document untouched
    pub async fn modify<R, F>(&self, id: &str, f: F) -> ApiResult<R>
    where
        F: FnOnce(&mut T) -> ApiResult<R>,
    {
        self.update(|records| {
            let record = records
                .iter_mut()
                .find(|r| r.id() == id)
                .ok_or_else(|| ApiError::NotFound(format!("{} not found", T::KIND)))?;
            f(record)
        })
        .await
    }

    /// Remove the record with `id` and return it
    pub async fn remove(&self, id: &str) -> ApiResult<T> {
        self.update(|records| {
            let index = records
                .iter()
                .position(|r| r.id() == id)
                .ok_or_else(|| ApiError::NotFound(format!("{} not found", T::KIND)))?;
            Ok(records.remove(index))
        })
        .await
    }

    /// Remove every record matching a predicate, returning how many went
    pub async fn remove_where<P>(&self, predicate: P) -> ApiResult<usize>
    where
        P: Fn(&T) -> bool,
    {
        self.update(|records| {
            let before = records.len();
            records.retain(|r| !predicate(r));
            Ok(before - records.len())
        })
        .await
    }
}
