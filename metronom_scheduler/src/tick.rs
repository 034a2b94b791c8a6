use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use metronom_models::job::BucketKey;
use metronom_storage::{JobRegistry, RegistryStorage};

use crate::{DeliveryChannel, fires_on};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);
const TICK_TIMEOUT: Duration = Duration::from_secs(50);

/// Runs once per minute: looks up the trigger bucket for the current UTC
/// minute, re-derives each job's local date from its stored offset, and
/// dispatches the jobs whose recurrence constraints match. Delivery is
/// at-most-once; a failed send is dropped until the next matching occurrence.
pub struct TickHandler<S> {
    registry: Arc<JobRegistry<S>>,
    delivery: Arc<dyn DeliveryChannel>,
    last_tick: Mutex<Option<i64>>,
}

impl<S: RegistryStorage> TickHandler<S> {
    pub fn new(registry: Arc<JobRegistry<S>>, delivery: Arc<dyn DeliveryChannel>) -> Self {
        Self {
            registry,
            delivery,
            last_tick: Mutex::new(None),
        }
    }

    pub async fn handle_tick(&self, now: DateTime<Utc>) -> anyhow::Result<()> {
        let key = BucketKey::from_utc(now);

        {
            // Monotonic guard: an overlapping or repeated tick for an already
            // handled minute must not double-send.
            let tick_id = now.timestamp().div_euclid(60);
            let mut last_tick = self.last_tick.lock().unwrap();
            if last_tick.is_some_and(|last| last >= tick_id) {
                log::warn!("Skipping already handled tick [bucket = {}]", key);
                return Ok(());
            }
            *last_tick = Some(tick_id);
        }

        let Some(bucket) = self.registry.lookup_bucket(key).await? else {
            return Ok(());
        };

        for (user_id, jobs) in &bucket {
            for job in jobs {
                let local_date = (now + chrono::Duration::hours(job.tz.hours() as i64)).date_naive();
                if !fires_on(job, local_date) {
                    continue;
                }

                let send = self.delivery.send_message(*user_id, &job.message);
                match tokio::time::timeout(SEND_TIMEOUT, send).await {
                    Ok(Ok(())) => {
                        log::info!("Delivered reminder [user_id = {}, bucket = {}]", user_id, key);
                    }
                    Ok(Err(error)) => {
                        log::warn!(
                            "Failed to deliver reminder [user_id = {}, error = {:#}]",
                            user_id,
                            error
                        );
                    }
                    Err(_) => {
                        log::warn!("Reminder delivery timed out [user_id = {}]", user_id);
                    }
                }
            }
        }

        Ok(())
    }

    /// Drives `handle_tick` from the host clock: waits for the next minute
    /// boundary, then ticks every 60 seconds until cancelled.
    pub async fn run(self: Arc<Self>, cancellation_token: CancellationToken) {
        let into_minute = Utc::now().second() as u64;
        let align = Duration::from_secs(60 - into_minute.min(59));

        tokio::select! {
            _ = cancellation_token.cancelled() => return,
            _ = tokio::time::sleep(align) => {}
        }

        let mut interval = tokio::time::interval(Duration::from_secs(60));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    log::info!("Scheduler tick loop stopped");
                    return;
                }
                _ = interval.tick() => {
                    let tick = tokio::time::timeout(TICK_TIMEOUT, self.handle_tick(Utc::now()));
                    match tick.await {
                        Ok(Ok(())) => {}
                        Ok(Err(error)) => log::error!("Scheduler tick failed [error = {:#}]", error),
                        Err(_) => log::error!("Scheduler tick timed out"),
                    }
                }
            }
        }
    }
}
