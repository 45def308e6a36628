use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::future::{BoxFuture, FutureExt};
use shared::protocol::TaskFilters;
use tokio::task::JoinHandle;
use tracing::debug;

use super::TaskDesk;

type Runner = dyn Fn(String) -> BoxFuture<'static, ()> + Send + Sync;

/// Runs the most recent query once input has been quiet for `delay`.
///
/// Queries superseded during the delay never start. A query that already
/// started is not cancelled, so its result may still land after a newer one.
#[derive(Clone)]
pub struct DebouncedSearch {
    generation: Arc<AtomicU64>,
    delay: Duration,
    run: Arc<Runner>,
}

impl DebouncedSearch {
    pub fn new<F, Fut>(delay: Duration, run: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            delay,
            run: Arc::new(move |query: String| run(query).boxed()),
        }
    }

    /// Searches tasks through `desk`. A blank query falls back to the plain
    /// filtered list.
    pub fn for_tasks(desk: Arc<TaskDesk>, delay: Duration, filters: TaskFilters) -> Self {
        Self::new(delay, move |query: String| {
            let desk = desk.clone();
            let filters = filters.clone();
            async move {
                let result = if query.trim().is_empty() {
                    desk.fetch_all(&filters).await
                } else {
                    desk.search(&query, &filters).await
                };
                if let Err(err) = result {
                    debug!(query = %query, "search: query failed: {err}");
                }
            }
        })
    }

    /// Records a keystroke. The returned handle resolves to `false` when a
    /// later input superseded this one before it ran.
    pub fn input(&self, query: impl Into<String>) -> JoinHandle<bool> {
        let query = query.into();
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation.clone();
        let run = self.run.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if generation.load(Ordering::SeqCst) != ticket {
                return false;
            }
            run(query).await;
            true
        })
    }
}
