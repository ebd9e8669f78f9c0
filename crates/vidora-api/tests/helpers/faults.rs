use async_trait::async_trait;
use uuid::Uuid;
use vidora_core::models::{Classification, MediaResource, NewMediaResource};
use vidora_core::AppError;
use vidora_db::{InMemoryMediaStore, MediaStore};

/// Which media store write should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFault {
    Create,
    BeginProcessing,
}

/// In-memory media store that fails one kind of write.
pub struct FaultyMediaStore {
    pub inner: InMemoryMediaStore,
    fault: MediaFault,
}

impl FaultyMediaStore {
    pub fn new(fault: MediaFault) -> Self {
        Self {
            inner: InMemoryMediaStore::new(),
            fault,
        }
    }

    fn fail(&self, op: &str) -> AppError {
        AppError::Internal(format!("injected {} failure", op))
    }
}

#[async_trait]
impl MediaStore for FaultyMediaStore {
    async fn create(&self, new: NewMediaResource) -> Result<MediaResource, AppError> {
        if self.fault == MediaFault::Create {
            return Err(self.fail("create"));
        }
        self.inner.create(new).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<MediaResource>, AppError> {
        self.inner.get(id).await
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<MediaResource>, AppError> {
        self.inner.list_by_owner(owner_id).await
    }

    async fn begin_processing(&self, id: Uuid) -> Result<Option<MediaResource>, AppError> {
        if self.fault == MediaFault::BeginProcessing {
            return Err(self.fail("begin_processing"));
        }
        self.inner.begin_processing(id).await
    }

    async fn advance_progress(&self, id: Uuid, from: i32, to: i32) -> Result<bool, AppError> {
        self.inner.advance_progress(id, from, to).await
    }

    async fn complete(
        &self,
        id: Uuid,
        from: i32,
        classification: Classification,
    ) -> Result<bool, AppError> {
        self.inner.complete(id, from, classification).await
    }

    async fn mark_failed(&self, id: Uuid) -> Result<bool, AppError> {
        self.inner.mark_failed(id).await
    }
}
