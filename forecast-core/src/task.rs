//! Background fetches with completions delivered back to the owner.
//!
//! [`ForecastTask::start`] returns immediately; network I/O and decoding run
//! on Tokio's blocking pool behind a semaphore. Every start produces exactly
//! one [`Completion`] on the [`CompletionQueue`], which the owning context
//! drains and hands to its [`ForecastListener`].

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::{
    runtime::Handle,
    sync::{Semaphore, mpsc},
};
use tracing::{debug, error};

use crate::{
    config::Config,
    icon::{HttpIconLoader, IconLoader},
    model::{CurrentForecast, FiveDayForecast, ForecastMode},
    pipeline::{Completion, FetchId, ForecastPipeline},
    source::{ForecastSource, HttpSource},
};

/// Receives fetch results on the context that drains the queue.
pub trait ForecastListener {
    fn on_single_day_loaded(&mut self, forecast: CurrentForecast);
    fn on_five_day_loaded(&mut self, forecasts: FiveDayForecast);
}

impl Completion {
    /// Hand the result to `listener`, returning the fetch it belongs to.
    pub fn deliver<L: ForecastListener + ?Sized>(self, listener: &mut L) -> FetchId {
        match self {
            Completion::SingleDay { id, forecast } => {
                listener.on_single_day_loaded(forecast);
                id
            }
            Completion::FiveDay { id, forecast } => {
                listener.on_five_day_loaded(forecast);
                id
            }
        }
    }
}

/// Owner-side end of the completion channel.
#[derive(Debug)]
pub struct CompletionQueue {
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl CompletionQueue {
    /// Wait for the next finished fetch. Returns `None` once the task has
    /// been dropped and every outstanding fetch has completed.
    pub async fn next(&mut self) -> Option<Completion> {
        self.rx.recv().await
    }

    /// Wait for the next finished fetch and deliver it to `listener`.
    pub async fn dispatch_next<L: ForecastListener + ?Sized>(
        &mut self,
        listener: &mut L,
    ) -> Option<FetchId> {
        let completion = self.next().await?;
        Some(completion.deliver(listener))
    }

    /// Deliver every completion that is already waiting, without blocking.
    pub fn dispatch_ready<L: ForecastListener + ?Sized>(&mut self, listener: &mut L) -> usize {
        let mut delivered = 0;
        while let Ok(completion) = self.rx.try_recv() {
            completion.deliver(listener);
            delivered += 1;
        }
        delivered
    }
}

/// Starts fire-and-forget forecast fetches.
///
/// There is no cancellation and no timeout; a stalled stream holds its
/// worker and permit until the connection drops.
#[derive(Debug)]
pub struct ForecastTask {
    pipeline: Arc<ForecastPipeline>,
    permits: Arc<Semaphore>,
    completions: mpsc::UnboundedSender<Completion>,
    next_id: AtomicU64,
    runtime: Handle,
}

impl ForecastTask {
    /// Task backed by the HTTP transport and icon loader.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: &Config) -> (Self, CompletionQueue) {
        Self::with_collaborators(
            config,
            Arc::new(HttpSource::new()),
            Arc::new(HttpIconLoader::new()),
        )
    }

    pub fn with_collaborators(
        config: &Config,
        source: Arc<dyn ForecastSource>,
        icons: Arc<dyn IconLoader>,
    ) -> (Self, CompletionQueue) {
        let (tx, rx) = mpsc::unbounded_channel();

        let task = Self {
            pipeline: Arc::new(ForecastPipeline::new(config, source, icons)),
            permits: Arc::new(Semaphore::new(config.worker_limit())),
            completions: tx,
            next_id: AtomicU64::new(1),
            runtime: Handle::current(),
        };

        (task, CompletionQueue { rx })
    }

    /// Begin one fetch and return at once. Its [`Completion`] arrives on the
    /// queue exactly once, even if the fetch fails.
    pub fn start(&self, zipcode: impl Into<String>, mode: ForecastMode) -> FetchId {
        let id = FetchId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let zipcode = zipcode.into();
        let pipeline = Arc::clone(&self.pipeline);
        let permits = Arc::clone(&self.permits);
        let completions = self.completions.clone();

        debug!(fetch = %id, %mode, "queueing forecast fetch");

        self.runtime.spawn(async move {
            // The semaphore is never closed, so acquiring only waits.
            let _permit = permits.acquire_owned().await.ok();

            let completion =
                match tokio::task::spawn_blocking(move || pipeline.run(id, &zipcode, mode)).await {
                    Ok(completion) => completion,
                    Err(err) => {
                        error!(fetch = %id, error = %err, "forecast worker panicked");
                        Completion::empty(id, mode)
                    }
                };

            if completions.send(completion).is_err() {
                debug!(fetch = %id, "completion queue dropped; discarding result");
            }
        });

        id
    }
}
