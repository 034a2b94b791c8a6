mod memory;
mod registry;
mod sqlite;

pub use memory::InMemoryRegistryStorage;
pub use registry::{JobRegistry, RegistryError};
pub use sqlite::{SqliteRegistryStorage, SqliteStorageError};

use async_trait::async_trait;

use metronom_models::{
    job::{BucketKey, Job, TriggerBucket, TzOffset},
    user::{UserAccount, UserId},
};

/// Document-store operations the registry runs against.
///
/// The surface mirrors the two persisted collections: one user document per
/// chat (`find_user`/`insert_user`/`upsert_offset`/`push_job`/`set_jobs`) and
/// one trigger document per UTC minute (`upsert_trigger`/`pull_trigger`/
/// `find_bucket`). `set_jobs` and `pull_trigger` report how many documents
/// they touched so the registry can detect a half-applied removal.
#[async_trait]
pub trait RegistryStorage: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn find_user(&self, id: UserId) -> Result<Option<UserAccount>, Self::Error>;
    async fn insert_user(&self, user: UserAccount) -> Result<(), Self::Error>;
    async fn upsert_offset(&self, id: UserId, offset: TzOffset) -> Result<(), Self::Error>;
    async fn push_job(&self, id: UserId, job: Job) -> Result<(), Self::Error>;
    async fn set_jobs(&self, id: UserId, jobs: Vec<Job>) -> Result<u64, Self::Error>;

    async fn upsert_trigger(
        &self,
        key: BucketKey,
        user: UserId,
        job: Job,
    ) -> Result<(), Self::Error>;
    async fn pull_trigger(
        &self,
        key: BucketKey,
        user: UserId,
        job: &Job,
    ) -> Result<u64, Self::Error>;
    async fn find_bucket(&self, key: BucketKey) -> Result<Option<TriggerBucket>, Self::Error>;
}
