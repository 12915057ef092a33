/// JSON Document Storage
///
/// Every resource type lives in one JSON document holding an array of
/// records. Backends store and fetch whole documents; `Collection` layers
/// typed read-modify-write cycles on top.

pub mod collection;
pub mod disk;
pub mod memory;

pub use collection::Collection;
pub use disk::DiskDocumentBackend;
pub use memory::MemoryDocumentBackend;

use crate::error::ApiResult;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// Document storage backend trait
///
/// Implementations handle the raw bytes of named documents.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Read a document, `None` if it has never been written
    async fn read(&self, name: &str) -> ApiResult<Option<Vec<u8>>>;

    /// Replace a document. Readers never observe a partial write.
    async fn write(&self, name: &str, data: Vec<u8>) -> ApiResult<()>;

    /// Verify the backend can currently accept writes
    async fn health_check(&self) -> ApiResult<()>;

    /// Short description for logs and health output
    fn describe(&self) -> String;
}

/// A record stored in a JSON document
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Document name, e.g. `pins` for `pins.json`
    const DOCUMENT: &'static str;

    /// Human readable kind used in error messages
    const KIND: &'static str;

    fn id(&self) -> &str;
}
