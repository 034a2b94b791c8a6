use thiserror::Error;

use metronom_models::{
    job::{BucketKey, Job, NewJob, TriggerBucket, TzOffset},
    user::{UserAccount, UserId},
};

use crate::RegistryStorage;

#[derive(Debug, Error)]
pub enum RegistryError<E>
where
    E: std::error::Error + 'static,
{
    #[error("reminder index is out of range")]
    InvalidIndex,
    #[error(
        "reminder removal left the indices inconsistent [user_removed = {user_removed}, trigger_removed = {trigger_removed}]"
    )]
    Inconsistent {
        user_removed: bool,
        trigger_removed: bool,
    },
    #[error(transparent)]
    Store(#[from] E),
}

/// The dual-indexed job registry.
///
/// Every job lives in exactly two places: its owner's ordered job list and the
/// trigger bucket computed from its own fire time and offset. Both sides are
/// written on insert and removal; a removal that touches only one side is
/// surfaced as `RegistryError::Inconsistent` instead of being rolled back.
pub struct JobRegistry<S> {
    storage: S,
}

impl<S: RegistryStorage> JobRegistry<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub async fn user(&self, id: UserId) -> Result<Option<UserAccount>, RegistryError<S::Error>> {
        Ok(self.storage.find_user(id).await?)
    }

    /// Appends a job to the user's list and to its trigger bucket, creating
    /// the account with the default offset on first use. The user's current
    /// offset is frozen into the job; later /settimezone calls do not move it.
    pub async fn add_job(
        &self,
        id: UserId,
        new_job: NewJob,
    ) -> Result<Job, RegistryError<S::Error>> {
        let job = match self.storage.find_user(id).await? {
            Some(user) => {
                let job = new_job.into_job(user.offset);
                self.storage.push_job(id, job.clone()).await?;
                job
            }
            None => {
                let job = new_job.into_job(TzOffset::DEFAULT);
                let mut account = UserAccount::new(id, TzOffset::DEFAULT);
                account.jobs.push(job.clone());
                self.storage.insert_user(account).await?;
                job
            }
        };

        self.storage
            .upsert_trigger(job.bucket_key(), id, job.clone())
            .await?;

        log::info!(
            "Registered reminder [user_id = {}, bucket = {}]",
            id,
            job.bucket_key()
        );

        Ok(job)
    }

    /// Sets the account's default offset, creating the account if needed.
    /// Existing jobs keep the offset and bucket they were registered with.
    pub async fn set_offset(
        &self,
        id: UserId,
        offset: TzOffset,
    ) -> Result<(), RegistryError<S::Error>> {
        self.storage.upsert_offset(id, offset).await?;
        Ok(())
    }

    pub async fn list_jobs(&self, id: UserId) -> Result<Option<Vec<Job>>, RegistryError<S::Error>> {
        Ok(self.storage.find_user(id).await?.map(|user| user.jobs))
    }

    /// Removes the job at the 1-based position shown by /view, from both
    /// indices. Both removals are attempted independently; if either side
    /// reports zero touched documents the registry is left as-is and the
    /// partial state is reported.
    pub async fn remove_job(
        &self,
        id: UserId,
        index: usize,
    ) -> Result<Job, RegistryError<S::Error>> {
        let Some(mut user) = self.storage.find_user(id).await? else {
            return Err(RegistryError::InvalidIndex);
        };

        if index == 0 || index > user.jobs.len() {
            return Err(RegistryError::InvalidIndex);
        }

        let job = user.jobs.remove(index - 1);

        let user_modified = self.storage.set_jobs(id, user.jobs).await?;
        let trigger_modified = self
            .storage
            .pull_trigger(job.bucket_key(), id, &job)
            .await?;

        if user_modified == 0 || trigger_modified == 0 {
            log::warn!(
                "Reminder removal did not touch both indices [user_id = {}, bucket = {}, user_modified = {}, trigger_modified = {}]",
                id,
                job.bucket_key(),
                user_modified,
                trigger_modified
            );
            return Err(RegistryError::Inconsistent {
                user_removed: user_modified > 0,
                trigger_removed: trigger_modified > 0,
            });
        }

        Ok(job)
    }

    pub async fn lookup_bucket(
        &self,
        key: BucketKey,
    ) -> Result<Option<TriggerBucket>, RegistryError<S::Error>> {
        Ok(self.storage.find_bucket(key).await?)
    }
}
