//! Explicit task-submission capability for protocol dispatch.
//!
//! Built once per process or session and passed around by handle; there is
//! no global executor state and no lazy initialization. The strategy set
//! is closed: callers pick an [`ExecutorProfile`] from configuration at
//! startup instead of naming an implementation dynamically.
//!
//! This capability dispatches requests and responses for the sessions it
//! serves; per-session serialization of sign/verify is carried by
//! [`crate::smb::session::SessionSigning`], so the manager itself is free
//! to parallelize across sessions.

use crate::config::SigningConfig;
use anyhow::{Result, anyhow, bail};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tokio::time::timeout;

/// Closed set of execution strategies, selected from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorProfile {
    /// At most `max_tasks` submitted futures run concurrently; the rest
    /// queue on a semaphore in submission order.
    Bounded { max_tasks: usize },
    /// No concurrency cap.
    Unbounded,
}

impl ExecutorProfile {
    /// Profile for the configured concurrency cap.
    pub fn from_config(config: &SigningConfig) -> Self {
        Self::Bounded {
            max_tasks: config.max_concurrent_tasks,
        }
    }
}

/// Task-submission handle: submit one task, submit many, wait for any or
/// all with an optional deadline.
///
/// Cloning is cheap; clones share the same concurrency cap. Must be
/// used within a Tokio runtime.
#[derive(Debug, Clone)]
pub struct WorkManager {
    limiter: Option<Arc<Semaphore>>,
}

impl WorkManager {
    pub fn new(profile: ExecutorProfile) -> Self {
        let limiter = match profile {
            ExecutorProfile::Bounded { max_tasks } => {
                Some(Arc::new(Semaphore::new(max_tasks.max(1))))
            }
            ExecutorProfile::Unbounded => None,
        };
        Self { limiter }
    }

    /// Submit a single task; it starts as soon as the profile allows.
    pub fn submit<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        match self.limiter.clone() {
            Some(limiter) => tokio::spawn(async move {
                // The manager never closes its own semaphore, so a failed
                // acquire can only mean shutdown-in-progress; run anyway.
                let _permit = limiter.acquire_owned().await.ok();
                task.await
            }),
            None => tokio::spawn(task),
        }
    }

    /// Submit every task and wait for all of them.
    ///
    /// Results come back in submission order. With a deadline, tasks still
    /// outstanding when it expires are aborted and an error is returned.
    pub async fn invoke_all<F, T>(&self, tasks: Vec<F>, deadline: Option<Duration>) -> Result<Vec<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let handles: Vec<JoinHandle<T>> = tasks.into_iter().map(|task| self.submit(task)).collect();
        let aborts: Vec<AbortHandle> = handles.iter().map(|h| h.abort_handle()).collect();

        let gather = async move {
            let mut results = Vec::with_capacity(handles.len());
            for handle in handles {
                results.push(handle.await.map_err(|e| anyhow!("submitted task failed: {e}"))?);
            }
            Ok(results)
        };

        match deadline {
            Some(limit) => match timeout(limit, gather).await {
                Ok(results) => results,
                Err(_) => {
                    for abort in aborts {
                        abort.abort();
                    }
                    Err(anyhow!("tasks did not complete within {limit:?}"))
                }
            },
            None => gather.await,
        }
    }

    /// Submit every task and return the first value to complete; the
    /// remaining tasks are aborted.
    pub async fn invoke_any<F, T>(&self, tasks: Vec<F>, deadline: Option<Duration>) -> Result<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if tasks.is_empty() {
            bail!("invoke_any called with no tasks");
        }

        let mut set = JoinSet::new();
        for task in tasks {
            match self.limiter.clone() {
                Some(limiter) => {
                    set.spawn(async move {
                        let _permit = limiter.acquire_owned().await.ok();
                        task.await
                    });
                }
                None => {
                    set.spawn(task);
                }
            }
        }

        // Dropping the set on any exit path aborts whatever is still
        // running.
        let race = async move {
            while let Some(joined) = set.join_next().await {
                if let Ok(value) = joined {
                    return Ok(value);
                }
            }
            Err(anyhow!("all submitted tasks failed"))
        };

        match deadline {
            Some(limit) => match timeout(limit, race).await {
                Ok(result) => result,
                Err(_) => Err(anyhow!("no task completed within {limit:?}")),
            },
            None => race.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_submit_returns_value() {
        let manager = WorkManager::new(ExecutorProfile::Unbounded);
        let handle = manager.submit(async { 40 + 2 });
        assert_eq!(handle.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_invoke_all_preserves_submission_order() {
        let manager = WorkManager::new(ExecutorProfile::Unbounded);
        let tasks: Vec<_> = (0..8u64)
            .map(|i| async move {
                // Later submissions finish earlier; order must still hold.
                sleep(Duration::from_millis(80 - i * 10)).await;
                i * 2
            })
            .collect();
        let results = manager.invoke_all(tasks, None).await.unwrap();
        assert_eq!(results, (0..8u64).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_invoke_all_deadline_expires() {
        let manager = WorkManager::new(ExecutorProfile::Unbounded);
        let tasks: Vec<_> = (0..3)
            .map(|_| async {
                sleep(Duration::from_secs(30)).await;
                0u8
            })
            .collect();
        let result = manager
            .invoke_all(tasks, Some(Duration::from_millis(50)))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_invoke_any_returns_fastest() {
        let manager = WorkManager::new(ExecutorProfile::Unbounded);
        let mut tasks = Vec::new();
        for i in 0..4u32 {
            tasks.push(async move {
                if i == 2 {
                    sleep(Duration::from_millis(10)).await;
                } else {
                    sleep(Duration::from_secs(30)).await;
                }
                i
            });
        }
        let winner = manager.invoke_any(tasks, None).await.unwrap();
        assert_eq!(winner, 2);
    }

    #[tokio::test]
    async fn test_invoke_any_deadline_expires() {
        let manager = WorkManager::new(ExecutorProfile::Unbounded);
        let tasks = vec![async {
            sleep(Duration::from_secs(30)).await;
            0u8
        }];
        let result = manager
            .invoke_any(tasks, Some(Duration::from_millis(50)))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_invoke_any_rejects_empty() {
        let manager = WorkManager::new(ExecutorProfile::Unbounded);
        let result = manager.invoke_any(Vec::<std::future::Ready<()>>::new(), None).await;
        assert!(result.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_bounded_profile_caps_concurrency() {
        let manager = WorkManager::new(ExecutorProfile::Bounded { max_tasks: 1 });
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                }
            })
            .collect();

        manager.invoke_all(tasks, None).await.unwrap();
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
