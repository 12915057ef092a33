/// In-memory document backend for tests and throwaway instances
use crate::{error::ApiResult, store::DocumentBackend};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryDocumentBackend {
    documents: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryDocumentBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentBackend for MemoryDocumentBackend {
    async fn read(&self, name: &str) -> ApiResult<Option<Vec<u8>>> {
        Ok(self.documents.read().await.get(name).cloned())
    }

    async fn write(&self, name: &str, data: Vec<u8>) -> ApiResult<()> {
        self.documents.write().await.insert(name.to_string(), data);
        Ok(())
    }

    async fn health_check(&self) -> ApiResult<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
