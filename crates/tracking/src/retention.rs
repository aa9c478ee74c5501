use std::{any::Any, panic::AssertUnwindSafe, time::Duration};

use futures::FutureExt;
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{client::Client, database::Database};

/// Periodically evicts reports older than the retention window, independent
/// of any read or write traffic.
pub struct RetentionTask<D: Database> {
    client: Client<D>,
    tick: Duration,
}

impl<D: Database> RetentionTask<D> {
    pub fn new(client: Client<D>, tick: Duration) -> Self {
        Self { client, tick }
    }

    /// Waiting time after consecutive failures, growing by one tick per
    /// failure up to ten ticks.
    fn backoff(&self, last_backoff: Duration) -> Duration {
        (last_backoff + self.tick).min(self.tick * 10)
    }

    fn describe_panic(error: &(dyn Any + Send)) -> &str {
        error
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| error.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("unknown panic")
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = time::interval(self.tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut backoff = Duration::ZERO;
            loop {
                interval.tick().await;
                let result = AssertUnwindSafe(self.client.evict_expired())
                    .catch_unwind()
                    .await;
                match result {
                    Ok(Ok(count)) => {
                        if count > 0 {
                            log::info!("evicted {count} expired position reports");
                        }
                        backoff = Duration::ZERO;
                        continue;
                    }
                    Ok(Err(why)) => {
                        log::warn!("eviction failed: {why}");
                    }
                    Err(why) => {
                        log::error!(
                            "eviction panicked: {}",
                            Self::describe_panic(why.as_ref())
                        );
                    }
                }
                backoff = self.backoff(backoff);
                time::sleep(backoff).await;
            }
        })
    }
}
