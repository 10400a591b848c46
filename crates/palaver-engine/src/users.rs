//! # UserService
//!
//! Thin cached access to user records; profile pages hit `user_{id}` far
//! more often than users change.

use std::sync::Arc;

use uuid::Uuid;

use palaver_core::error::Result;
use palaver_core::models::User;
use palaver_core::traits::ForumRepo;

use crate::cache::{self, Memo};

pub struct UserService {
    repo: Arc<dyn ForumRepo>,
    memo: Memo,
}

impl UserService {
    pub fn new(repo: Arc<dyn ForumRepo>, memo: Memo) -> Self {
        Self { repo, memo }
    }

    /// A single user, memoized under `user_{id}`.
    pub async fn find(&self, id: Uuid) -> Result<Option<User>> {
        let repo = self.repo.clone();

        self.memo
            .remember(&cache::user_key(id), || async move {
                Ok(repo.get_user(id).await?)
            })
            .await
    }

    /// Persist a user and drop their cached record.
    pub async fn save(&self, user: &User) -> Result<()> {
        self.repo.save_user(user).await?;
        self.memo.forget(&cache::user_key(user.id)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{user, MapCacheStore};
    use palaver_core::traits::MockForumRepo;
    use std::time::Duration;

    #[tokio::test]
    async fn find_hits_storage_once_until_saved() {
        let record = user(1, "ridley");
        let id = record.id;

        let mut repo = MockForumRepo::new();
        let found = record.clone();
        repo.expect_get_user()
            .times(2)
            .returning(move |_| Ok(Some(found.clone())));
        repo.expect_save_user().times(1).returning(|_| Ok(()));

        let memo = Memo::new(Arc::new(MapCacheStore::default()), Duration::from_secs(60));
        let service = UserService::new(Arc::new(repo), memo);

        assert!(service.find(id).await.unwrap().is_some());
        // Second read is served from the cache.
        assert!(service.find(id).await.unwrap().is_some());

        service.save(&record).await.unwrap();
        assert!(service.find(id).await.unwrap().is_some());
    }
}
