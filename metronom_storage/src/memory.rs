use std::collections::HashMap;
use std::convert::Infallible;

use async_trait::async_trait;
use tokio::sync::RwLock;

use metronom_models::{
    job::{BucketKey, Job, TriggerBucket, TzOffset},
    user::{UserAccount, UserId},
};

use crate::RegistryStorage;

#[derive(Default)]
struct State {
    users: HashMap<UserId, UserAccount>,
    triggers: HashMap<BucketKey, TriggerBucket>,
}

/// Registry storage held entirely in process memory. Used by the tests and
/// usable for ephemeral deployments that can afford to lose reminders on
/// restart.
#[derive(Default)]
pub struct InMemoryRegistryStorage {
    state: RwLock<State>,
}

impl InMemoryRegistryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistryStorage for InMemoryRegistryStorage {
    type Error = Infallible;

    async fn find_user(&self, id: UserId) -> Result<Option<UserAccount>, Self::Error> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).cloned())
    }

    async fn insert_user(&self, user: UserAccount) -> Result<(), Self::Error> {
        let mut state = self.state.write().await;
        state.users.insert(user.id, user);
        Ok(())
    }

    async fn upsert_offset(&self, id: UserId, offset: TzOffset) -> Result<(), Self::Error> {
        let mut state = self.state.write().await;
        state
            .users
            .entry(id)
            .and_modify(|user| user.offset = offset)
            .or_insert_with(|| UserAccount::new(id, offset));
        Ok(())
    }

    async fn push_job(&self, id: UserId, job: Job) -> Result<(), Self::Error> {
        let mut state = self.state.write().await;
        if let Some(user) = state.users.get_mut(&id) {
            user.jobs.push(job);
        }
        Ok(())
    }

    async fn set_jobs(&self, id: UserId, jobs: Vec<Job>) -> Result<u64, Self::Error> {
        let mut state = self.state.write().await;
        match state.users.get_mut(&id) {
            Some(user) => {
                user.jobs = jobs;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn upsert_trigger(
        &self,
        key: BucketKey,
        user: UserId,
        job: Job,
    ) -> Result<(), Self::Error> {
        let mut state = self.state.write().await;
        state
            .triggers
            .entry(key)
            .or_default()
            .entry(user)
            .or_default()
            .push(job);
        Ok(())
    }

    async fn pull_trigger(
        &self,
        key: BucketKey,
        user: UserId,
        job: &Job,
    ) -> Result<u64, Self::Error> {
        let mut state = self.state.write().await;
        let Some(bucket) = state.triggers.get_mut(&key) else {
            return Ok(0);
        };
        let Some(jobs) = bucket.get_mut(&user) else {
            return Ok(0);
        };
        let Some(position) = jobs.iter().position(|candidate| candidate == job) else {
            return Ok(0);
        };

        jobs.remove(position);
        if jobs.is_empty() {
            bucket.remove(&user);
        }
        if bucket.is_empty() {
            state.triggers.remove(&key);
        }

        Ok(1)
    }

    async fn find_bucket(&self, key: BucketKey) -> Result<Option<TriggerBucket>, Self::Error> {
        let state = self.state.read().await;
        Ok(state.triggers.get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(time: &str, message: &str, tz: i8) -> Job {
        Job {
            fire_at: time.parse().unwrap(),
            message: message.to_string(),
            day: None,
            date: None,
            month: None,
            tz: TzOffset::new(tz).unwrap(),
        }
    }

    #[tokio::test]
    async fn upsert_offset_creates_an_empty_account() {
        let storage = InMemoryRegistryStorage::new();

        storage.upsert_offset(1, TzOffset::new(-5).unwrap()).await.unwrap();

        let user = storage.find_user(1).await.unwrap().unwrap();
        assert_eq!(user.offset, TzOffset::new(-5).unwrap());
        assert!(user.jobs.is_empty());
    }

    #[tokio::test]
    async fn upsert_offset_keeps_existing_jobs() {
        let storage = InMemoryRegistryStorage::new();
        let mut account = UserAccount::new(1, TzOffset::DEFAULT);
        account.jobs.push(job("0900", "water plants", 8));
        storage.insert_user(account).await.unwrap();

        storage.upsert_offset(1, TzOffset::new(2).unwrap()).await.unwrap();

        let user = storage.find_user(1).await.unwrap().unwrap();
        assert_eq!(user.offset, TzOffset::new(2).unwrap());
        assert_eq!(user.jobs.len(), 1);
    }

    #[tokio::test]
    async fn pull_trigger_removes_a_single_occurrence() {
        let storage = InMemoryRegistryStorage::new();
        let duplicated = job("1907", "dinner", 8);
        let key = duplicated.bucket_key();

        storage.upsert_trigger(key, 1, duplicated.clone()).await.unwrap();
        storage.upsert_trigger(key, 1, duplicated.clone()).await.unwrap();

        let removed = storage.pull_trigger(key, 1, &duplicated).await.unwrap();
        assert_eq!(removed, 1);

        let bucket = storage.find_bucket(key).await.unwrap().unwrap();
        assert_eq!(bucket[&1].len(), 1, "The twin entry should survive.");
    }

    #[tokio::test]
    async fn pull_trigger_reports_missing_entries() {
        let storage = InMemoryRegistryStorage::new();
        let absent = job("1907", "dinner", 8);

        let removed = storage.pull_trigger(absent.bucket_key(), 1, &absent).await.unwrap();

        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn empty_buckets_are_pruned() {
        let storage = InMemoryRegistryStorage::new();
        let only = job("1907", "dinner", 8);
        let key = only.bucket_key();

        storage.upsert_trigger(key, 1, only.clone()).await.unwrap();
        storage.pull_trigger(key, 1, &only).await.unwrap();

        assert!(storage.find_bucket(key).await.unwrap().is_none());
    }
}
