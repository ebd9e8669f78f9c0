//! In-process stores with the same compare-and-set semantics as PostgreSQL.
//!
//! Each write takes the map lock once, checks the expected state and mutates
//! under that same lock, so concurrent writers serialize exactly like
//! conditional `UPDATE`s do.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;
use vidora_core::constants::PROGRESS_COMPLETE_PERCENT;
use vidora_core::models::{
    Classification, MediaResource, NewMediaResource, NewUser, ResourceStatus, User,
};
use vidora_core::AppError;

use super::media::MediaStore;
use super::user::UserStore;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, AppError> {
    mutex
        .lock()
        .map_err(|_| AppError::Internal("in-memory store lock poisoned".to_string()))
}

#[derive(Clone, Default)]
pub struct InMemoryMediaStore {
    resources: Arc<Mutex<HashMap<Uuid, MediaResource>>>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record as-is; used to seed fixtures.
    pub fn insert(&self, resource: MediaResource) -> Result<(), AppError> {
        lock(&self.resources)?.insert(resource.id, resource);
        Ok(())
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn create(&self, new: NewMediaResource) -> Result<MediaResource, AppError> {
        let resource = new.into_resource(Uuid::new_v4(), Utc::now());
        lock(&self.resources)?.insert(resource.id, resource.clone());
        Ok(resource)
    }

    async fn get(&self, id: Uuid) -> Result<Option<MediaResource>, AppError> {
        Ok(lock(&self.resources)?.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<MediaResource>, AppError> {
        let mut owned: Vec<MediaResource> = lock(&self.resources)?
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(owned)
    }

    async fn begin_processing(&self, id: Uuid) -> Result<Option<MediaResource>, AppError> {
        let mut resources = lock(&self.resources)?;
        match resources.get_mut(&id) {
            Some(r) if r.status == ResourceStatus::Pending => {
                r.status = ResourceStatus::Processing;
                r.progress_percent = 0;
                r.updated_at = Utc::now();
                Ok(Some(r.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn advance_progress(&self, id: Uuid, from: i32, to: i32) -> Result<bool, AppError> {
        if to <= from || to > PROGRESS_COMPLETE_PERCENT {
            return Ok(false);
        }
        let mut resources = lock(&self.resources)?;
        match resources.get_mut(&id) {
            Some(r) if r.status == ResourceStatus::Processing && r.progress_percent == from => {
                r.progress_percent = to;
                r.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete(
        &self,
        id: Uuid,
        from: i32,
        classification: Classification,
    ) -> Result<bool, AppError> {
        let mut resources = lock(&self.resources)?;
        match resources.get_mut(&id) {
            Some(r)
                if r.status == ResourceStatus::Processing
                    && r.progress_percent == from
                    && r.classification.is_none() =>
            {
                r.status = ResourceStatus::Complete;
                r.progress_percent = PROGRESS_COMPLETE_PERCENT;
                r.classification = Some(classification);
                r.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_failed(&self, id: Uuid) -> Result<bool, AppError> {
        let mut resources = lock(&self.resources)?;
        match resources.get_mut(&id) {
            Some(r) if !r.status.is_terminal() => {
                r.status = ResourceStatus::Failed;
                r.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, new: NewUser) -> Result<User, AppError> {
        let mut users = lock(&self.users)?;
        if users.values().any(|u| u.email == new.email) {
            return Err(AppError::UserExists(new.email));
        }
        let user = new.into_user(Uuid::new_v4(), Utc::now());
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(lock(&self.users)?
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(lock(&self.users)?.get(&id).cloned())
    }
}
