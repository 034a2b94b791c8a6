use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{Connection, params};
use thiserror::Error;

use metronom_models::{
    job::{BucketKey, Job, TriggerBucket, TzOffset},
    user::{UserAccount, UserId},
};

use crate::RegistryStorage;

#[derive(Debug, Error)]
pub enum SqliteStorageError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// SQLite-backed registry storage.
///
/// The layout keeps the two-collection document shape: one `user_cron` row
/// per user with the job list as a JSON array, one `cron_trigger` row per UTC
/// `HHMM` bucket with a user-id to job-list JSON map.
pub struct SqliteRegistryStorage {
    conn: Mutex<Connection>,
}

impl SqliteRegistryStorage {
    pub fn open(db_path: &Path) -> Result<Self, SqliteStorageError> {
        Self::from_connection(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self, SqliteStorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, SqliteStorageError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;

             CREATE TABLE IF NOT EXISTS user_cron (
                 id INTEGER PRIMARY KEY,
                 offset INTEGER NOT NULL,
                 jobs TEXT NOT NULL
             );

             CREATE TABLE IF NOT EXISTS cron_trigger (
                 id TEXT PRIMARY KEY,
                 entries TEXT NOT NULL
             );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn offset_from_row(id: UserId, raw: i64) -> TzOffset {
    i8::try_from(raw)
        .ok()
        .and_then(TzOffset::new)
        .unwrap_or_else(|| {
            log::warn!(
                "Stored offset is out of range, defaulting [user_id = {}, offset = {}]",
                id,
                raw
            );
            TzOffset::DEFAULT
        })
}

fn load_user(conn: &Connection, id: UserId) -> Result<Option<UserAccount>, SqliteStorageError> {
    let mut stmt = conn.prepare("SELECT offset, jobs FROM user_cron WHERE id = ?1")?;
    let row = stmt.query_row(params![id], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    });

    match row {
        Ok((offset, jobs)) => Ok(Some(UserAccount {
            id,
            offset: offset_from_row(id, offset),
            jobs: serde_json::from_str(&jobs)?,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

fn load_bucket(
    conn: &Connection,
    key: BucketKey,
) -> Result<Option<TriggerBucket>, SqliteStorageError> {
    let mut stmt = conn.prepare("SELECT entries FROM cron_trigger WHERE id = ?1")?;
    let row = stmt.query_row(params![key.to_string()], |row| row.get::<_, String>(0));

    match row {
        Ok(entries) => Ok(Some(serde_json::from_str(&entries)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

fn store_bucket(
    conn: &Connection,
    key: BucketKey,
    bucket: &TriggerBucket,
) -> Result<(), SqliteStorageError> {
    conn.execute(
        "INSERT OR REPLACE INTO cron_trigger (id, entries) VALUES (?1, ?2)",
        params![key.to_string(), serde_json::to_string(bucket)?],
    )?;
    Ok(())
}

#[async_trait]
impl RegistryStorage for SqliteRegistryStorage {
    type Error = SqliteStorageError;

    async fn find_user(&self, id: UserId) -> Result<Option<UserAccount>, Self::Error> {
        let conn = self.conn.lock().unwrap();
        load_user(&conn, id)
    }

    async fn insert_user(&self, user: UserAccount) -> Result<(), Self::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO user_cron (id, offset, jobs) VALUES (?1, ?2, ?3)",
            params![
                user.id,
                user.offset.hours() as i64,
                serde_json::to_string(&user.jobs)?
            ],
        )?;
        Ok(())
    }

    async fn upsert_offset(&self, id: UserId, offset: TzOffset) -> Result<(), Self::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user_cron (id, offset, jobs) VALUES (?1, ?2, '[]')
             ON CONFLICT(id) DO UPDATE SET offset = excluded.offset",
            params![id, offset.hours() as i64],
        )?;
        Ok(())
    }

    async fn push_job(&self, id: UserId, job: Job) -> Result<(), Self::Error> {
        let conn = self.conn.lock().unwrap();
        let Some(mut user) = load_user(&conn, id)? else {
            // Matches a $push against a missing document: a no-op.
            return Ok(());
        };
        user.jobs.push(job);
        conn.execute(
            "UPDATE user_cron SET jobs = ?2 WHERE id = ?1",
            params![id, serde_json::to_string(&user.jobs)?],
        )?;
        Ok(())
    }

    async fn set_jobs(&self, id: UserId, jobs: Vec<Job>) -> Result<u64, Self::Error> {
        let conn = self.conn.lock().unwrap();
        let modified = conn.execute(
            "UPDATE user_cron SET jobs = ?2 WHERE id = ?1",
            params![id, serde_json::to_string(&jobs)?],
        )?;
        Ok(modified as u64)
    }

    async fn upsert_trigger(
        &self,
        key: BucketKey,
        user: UserId,
        job: Job,
    ) -> Result<(), Self::Error> {
        let conn = self.conn.lock().unwrap();
        let mut bucket = load_bucket(&conn, key)?.unwrap_or_default();
        bucket.entry(user).or_default().push(job);
        store_bucket(&conn, key, &bucket)
    }

    async fn pull_trigger(
        &self,
        key: BucketKey,
        user: UserId,
        job: &Job,
    ) -> Result<u64, Self::Error> {
        let conn = self.conn.lock().unwrap();
        let Some(mut bucket) = load_bucket(&conn, key)? else {
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
            conn.execute(
                "DELETE FROM cron_trigger WHERE id = ?1",
                params![key.to_string()],
            )?;
        } else {
            store_bucket(&conn, key, &bucket)?;
        }

        Ok(1)
    }

    async fn find_bucket(&self, key: BucketKey) -> Result<Option<TriggerBucket>, Self::Error> {
        let conn = self.conn.lock().unwrap();
        load_bucket(&conn, key)
    }
}
