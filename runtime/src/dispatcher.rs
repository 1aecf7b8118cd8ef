//! Background redelivery of best-effort notifications.
//!
//! The request path makes one bounded delivery attempt. When that fails the
//! job is handed to a [`NotificationDispatcher`], which owns a bounded queue
//! and a single worker task retrying each job with [`RetryPolicy`]. Nothing is
//! reported back to the original caller: outcomes are logged and counted.
//!
//! # Example
//!
//! ```rust
//! use booking_runtime::dispatcher::{DispatcherConfig, NotificationDispatcher};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let (dispatcher, worker) = NotificationDispatcher::spawn(
//!     DispatcherConfig::default(),
//!     |text: String| async move {
//!         println!("delivering {text}");
//!         Ok::<_, String>(())
//!     },
//! );
//!
//! dispatcher.enqueue("Your accommodation has been reserved".to_string());
//! worker.shutdown(Duration::from_secs(5)).await;
//! # }
//! ```

use crate::metrics::{NotificationMetrics, NotificationOutcome};
use crate::retry::{RetryPolicy, retry_with_backoff};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Dispatcher sizing and retry behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatcherConfig {
    /// Jobs that may wait before new ones are dropped
    pub queue_capacity: usize,
    /// Backoff applied to each job
    pub retry: RetryPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            retry: RetryPolicy::default(),
        }
    }
}

/// Sending side of the dispatcher. Cheap to clone.
#[derive(Debug)]
pub struct NotificationDispatcher<J> {
    tx: mpsc::Sender<J>,
}

impl<J> Clone for NotificationDispatcher<J> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Owns the worker task. Dropping it without calling
/// [`shutdown`](Self::shutdown) also asks the worker to drain and stop.
#[derive(Debug)]
pub struct DispatcherWorker {
    stop: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl<J: Send + Sync + Clone + 'static> NotificationDispatcher<J> {
    /// Start the worker. `send` performs one delivery attempt.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, Fut, E>(config: DispatcherConfig, send: F) -> (Self, DispatcherWorker)
    where
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (stop, stopped) = oneshot::channel();
        let join = tokio::spawn(run(rx, stopped, send, config.retry));

        (Self { tx }, DispatcherWorker { stop, join })
    }

    /// Queue a job for background delivery.
    ///
    /// Returns `false` when the job was dropped because the queue is full or
    /// the worker has stopped.
    pub fn enqueue(&self, job: J) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => {
                NotificationMetrics::record(NotificationOutcome::Deferred);
                NotificationMetrics::record_queue_depth(self.depth());
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                NotificationMetrics::record(NotificationOutcome::Dropped);
                tracing::warn!(
                    capacity = self.tx.max_capacity(),
                    "Notification queue full, dropping notification"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                NotificationMetrics::record(NotificationOutcome::Dropped);
                tracing::warn!("Notification dispatcher stopped, dropping notification");
                false
            }
        }
    }

    /// Jobs currently waiting.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

impl DispatcherWorker {
    /// Stop accepting jobs, deliver what is queued, and wait up to `grace`.
    ///
    /// Returns `true` if the worker finished within the grace period.
    pub async fn shutdown(self, grace: Duration) -> bool {
        let _ = self.stop.send(());
        let mut join = self.join;
        if let Ok(joined) = tokio::time::timeout(grace, &mut join).await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Notification worker terminated abnormally");
            }
            true
        } else {
            tracing::warn!(
                grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                "Notification worker did not drain in time, aborting"
            );
            join.abort();
            false
        }
    }
}

async fn run<J, F, Fut, E>(
    mut rx: mpsc::Receiver<J>,
    mut stopped: oneshot::Receiver<()>,
    send: F,
    policy: RetryPolicy,
) where
    J: Clone,
    F: Fn(J) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    loop {
        tokio::select! {
            biased;
            _ = &mut stopped => break,
            job = rx.recv() => match job {
                Some(job) => deliver(&send, &policy, job).await,
                None => return,
            },
        }
    }

    rx.close();
    tracing::info!(pending = rx.len(), "Draining notification queue");
    while let Some(job) = rx.recv().await {
        deliver(&send, &policy, job).await;
    }
}

async fn deliver<J, F, Fut, E>(send: &F, policy: &RetryPolicy, job: J)
where
    J: Clone,
    F: Fn(J) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    match retry_with_backoff(policy, || send(job.clone())).await {
        Ok(()) => {
            NotificationMetrics::record(NotificationOutcome::Redelivered);
            tracing::debug!("Deferred notification delivered");
        }
        Err(e) => {
            NotificationMetrics::record(NotificationOutcome::Exhausted);
            tracing::warn!(error = %e, "Giving up on notification after retries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{Mutex, Notify};

    fn quick() -> DispatcherConfig {
        DispatcherConfig {
            queue_capacity: 8,
            retry: RetryPolicy::builder()
                .max_retries(3)
                .initial_delay(Duration::from_millis(5))
                .build(),
        }
    }

    #[tokio::test]
    async fn test_delivers_after_transient_failures() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let delivered = Arc::new(Mutex::new(Vec::new()));

        let (dispatcher, worker) = {
            let attempts = Arc::clone(&attempts);
            let delivered = Arc::clone(&delivered);
            NotificationDispatcher::spawn(quick(), move |job: u32| {
                let attempts = Arc::clone(&attempts);
                let delivered = Arc::clone(&delivered);
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        return Err("unavailable");
                    }
                    delivered.lock().await.push(job);
                    Ok(())
                }
            })
        };

        assert!(dispatcher.enqueue(7));
        assert!(worker.shutdown(Duration::from_secs(2)).await);

        assert_eq!(*delivered.lock().await, vec![7]);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let attempts = Arc::new(AtomicUsize::new(0));

        let (dispatcher, worker) = {
            let attempts = Arc::clone(&attempts);
            NotificationDispatcher::spawn(quick(), move |_job: u32| {
                let attempts = Arc::clone(&attempts);
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("down")
                }
            })
        };

        dispatcher.enqueue(1);
        assert!(worker.shutdown(Duration::from_secs(2)).await);

        // Initial attempt plus three retries
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_full_queue_drops_jobs() {
        let started = Arc::new(Notify::new());
        let gate = Arc::new(Notify::new());

        let config = DispatcherConfig {
            queue_capacity: 1,
            ..quick()
        };
        let (dispatcher, worker) = {
            let started = Arc::clone(&started);
            let gate = Arc::clone(&gate);
            NotificationDispatcher::spawn(config, move |_job: u32| {
                let started = Arc::clone(&started);
                let gate = Arc::clone(&gate);
                async move {
                    started.notify_one();
                    gate.notified().await;
                    Ok::<_, String>(())
                }
            })
        };

        assert!(dispatcher.enqueue(1));
        started.notified().await;

        // Worker is busy with job 1; one slot left in the queue
        assert!(dispatcher.enqueue(2));
        assert!(!dispatcher.enqueue(3));
        assert_eq!(dispatcher.depth(), 1);

        gate.notify_one();
        started.notified().await;
        gate.notify_one();
        assert!(worker.shutdown(Duration::from_secs(2)).await);
    }

    #[derive(Debug, Clone)]
    struct Message {
        text: String,
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_owned_jobs_drain_on_a_threaded_runtime() {
        let delivered = Arc::new(Mutex::new(Vec::new()));

        let (dispatcher, worker) = {
            let delivered = Arc::clone(&delivered);
            NotificationDispatcher::spawn(quick(), move |job: Message| {
                let delivered = Arc::clone(&delivered);
                async move {
                    delivered.lock().await.push(job.text);
                    Ok::<_, String>(())
                }
            })
        };

        for text in ["reserved", "cancelled"] {
            assert!(dispatcher.enqueue(Message {
                text: text.to_string(),
            }));
        }
        assert!(worker.shutdown(Duration::from_secs(2)).await);
        assert_eq!(*delivered.lock().await, vec!["reserved", "cancelled"]);
    }

    #[tokio::test]
    async fn test_enqueue_after_shutdown_is_dropped() {
        let (dispatcher, worker) =
            NotificationDispatcher::spawn(quick(), |_job: u32| async { Ok::<_, String>(()) });

        assert!(worker.shutdown(Duration::from_secs(1)).await);
        assert!(!dispatcher.enqueue(1));
    }
}
