//! Power-state polling
//!
//! Boot and shutdown only enqueue a transition; this module polls `read`
//! until the instance reports the expected status.

use crate::client::RemoteResourceClient;
use crate::error::{CloudError, Result};
use crate::model::Instance;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Interval between two status reads
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Budget for a single power transition
pub const DEFAULT_POWER_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Predicate: the instance is powered on
pub fn is_up(instance: &Instance) -> bool {
    instance.is_up()
}

/// Predicate: the instance is powered off
pub fn is_down(instance: &Instance) -> bool {
    instance.is_down()
}

/// Polls an instance until its status satisfies a predicate
pub struct PollingWaiter<C: RemoteResourceClient + ?Sized> {
    client: Arc<C>,
    interval: Duration,
}

impl<C: RemoteResourceClient + ?Sized> Clone for PollingWaiter<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            interval: self.interval,
        }
    }
}

impl<C: RemoteResourceClient + ?Sized> PollingWaiter<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until `predicate` holds for instance `id`
    ///
    /// # Returns
    /// * `Ok(instance)` - the first snapshot satisfying the predicate
    /// * `Err(CloudError::Timeout)` - `timeout` elapsed first
    /// * any `read` error, immediately and without retry
    ///
    /// A `timeout` too large to represent as a deadline waits without one.
    pub async fn wait_for_status<P>(
        &self,
        id: &str,
        predicate: P,
        timeout: Duration,
    ) -> Result<Instance>
    where
        P: Fn(&Instance) -> bool + Send,
    {
        let deadline = Instant::now().checked_add(timeout);
        let mut attempts: u32 = 0;

        loop {
            let instance = self.client.read(id).await?;
            attempts = attempts.saturating_add(1);

            if predicate(&instance) {
                tracing::debug!(
                    "Instance {} reached status {} after {} read(s)",
                    id,
                    instance.status,
                    attempts
                );
                return Ok(instance);
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(CloudError::Timeout(format!(
                            "instance {} still {} after {:?} ({} reads)",
                            id, instance.status, timeout, attempts
                        )));
                    }
                    // never sleep past the deadline
                    self.interval.min(deadline - now)
                }
                None => self.interval,
            };

            tracing::debug!(
                "Instance {} is {}, polling again in {:?}",
                id,
                instance.status,
                self.interval
            );

            sleep(pause).await;
        }
    }
}
