//! Per-target request lifecycle: supersession, debounce and the only path by
//! which loaded images reach a display target.
//!
//! Every target has at most one registered [`CancellationToken`]. Assigning a
//! new reference swaps in a fresh token and cancels the old one under the
//! registry lock. Display writes are decided under that same lock, after
//! checking the writer still holds the registered token, and queued in the
//! order they were decided. The queue is flushed once the lock is released,
//! so a binding may call back into the manager from `set_image` or
//! `set_loading`. A superseded request therefore can never write, and
//! whoever removes a registry entry is the one that lowers the target's
//! loading flag.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

use crate::domain::entities::{
    DisplayImage, Dimensions, ImageReference, LoadRequest, LoadedImage, TargetId,
};
use crate::domain::ports::DisplayBinding;

use super::cancellation::CancellationToken;
use super::source_resolver::SourceResolver;

/// Default wait before a request commits to resolving.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(10);

#[derive(Debug)]
enum DisplayWrite {
    Image(TargetId, Option<DisplayImage>),
    Loading(TargetId, bool),
}

#[derive(Default)]
struct WriteQueue {
    pending: VecDeque<DisplayWrite>,
    flushing: bool,
}

struct Shared {
    resolver: Arc<SourceResolver>,
    display: Arc<dyn DisplayBinding>,
    registry: Mutex<HashMap<TargetId, CancellationToken>>,
    writes: Mutex<WriteQueue>,
    debounce: Duration,
}

/// Drives image loads for display targets.
pub struct RequestLifecycleManager {
    shared: Arc<Shared>,
    tasks: Mutex<JoinSet<()>>,
    runtime: Handle,
}

impl RequestLifecycleManager {
    /// Creates a manager bound to the current tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn new(
        resolver: Arc<SourceResolver>,
        display: Arc<dyn DisplayBinding>,
        debounce: Duration,
    ) -> Self {
        Self::with_runtime(resolver, display, debounce, Handle::current())
    }

    /// Creates a manager spawning its work on `runtime`, so reference
    /// changes can be posted from threads outside the runtime.
    #[must_use]
    pub fn with_runtime(
        resolver: Arc<SourceResolver>,
        display: Arc<dyn DisplayBinding>,
        debounce: Duration,
        runtime: Handle,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                resolver,
                display,
                registry: Mutex::new(HashMap::new()),
                writes: Mutex::new(WriteQueue::default()),
                debounce,
            }),
            tasks: Mutex::new(JoinSet::new()),
            runtime,
        }
    }

    /// Reacts to `target` being assigned a new reference. Never blocks.
    ///
    /// `None` (or an empty reference) clears the target's image immediately
    /// without entering the loading state.
    pub fn on_reference_changed(
        &self,
        target: TargetId,
        reference: Option<ImageReference>,
        dimensions: Dimensions,
    ) {
        let reference = reference.filter(|r| !r.as_str().trim().is_empty());

        let Some(reference) = reference else {
            {
                let mut registry = self.shared.registry.lock();
                let mut writes = self.shared.writes.lock();
                if let Some(previous) = registry.remove(&target) {
                    previous.cancel();
                    writes.pending.push_back(DisplayWrite::Loading(target, false));
                }
                writes.pending.push_back(DisplayWrite::Image(target, None));
            }
            debug!(target = %target, "Cleared target image");
            self.shared.flush();
            return;
        };

        let token = CancellationToken::new();
        {
            let mut registry = self.shared.registry.lock();
            if let Some(previous) = registry.insert(target, token.clone()) {
                previous.cancel();
                trace!(target = %target, "Superseded in-flight request");
            }
            self.shared
                .writes
                .lock()
                .pending
                .push_back(DisplayWrite::Loading(target, true));
        }
        self.shared.flush();

        debug!(target = %target, reference = %reference, dimensions = %dimensions, "Starting image request");
        let request = LoadRequest::new(target, reference, dimensions);
        let shared = self.shared.clone();

        let mut tasks = self.tasks.lock();
        while tasks.try_join_next().is_some() {}
        tasks.spawn_on(shared.run(request, token), &self.runtime);
    }

    /// Abandons the target's current request. Its image is left as is.
    pub fn cancel(&self, target: TargetId) {
        let cancelled = {
            let mut registry = self.shared.registry.lock();
            let removed = registry.remove(&target);
            if let Some(token) = &removed {
                token.cancel();
                self.shared
                    .writes
                    .lock()
                    .pending
                    .push_back(DisplayWrite::Loading(target, false));
            }
            removed.is_some()
        };
        if cancelled {
            debug!(target = %target, "Cancelled image request");
            self.shared.flush();
        }
    }

    /// Abandons every in-flight request.
    pub fn cancel_all(&self) {
        let count = {
            let mut registry = self.shared.registry.lock();
            let mut writes = self.shared.writes.lock();
            let count = registry.len();
            for (target, token) in registry.drain() {
                token.cancel();
                writes.pending.push_back(DisplayWrite::Loading(target, false));
            }
            count
        };
        if count > 0 {
            debug!(count, "Cancelled all pending image requests");
            self.shared.flush();
        }
    }

    /// Returns true if a request for `target` has not settled yet.
    #[must_use]
    pub fn is_loading(&self, target: TargetId) -> bool {
        self.shared.registry.lock().contains_key(&target)
    }

    /// Returns the number of unsettled requests.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.registry.lock().len()
    }

    /// Waits until every spawned request task has finished.
    pub async fn wait_idle(&self) {
        loop {
            let mut tasks = std::mem::take(&mut *self.tasks.lock());
            if tasks.is_empty() {
                return;
            }
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    warn!(error = %e, "Image request task failed");
                }
            }
        }
    }

    /// Cancels outstanding work, waits for it to drain and releases the
    /// network transport.
    pub async fn shutdown(&self) {
        self.cancel_all();
        self.wait_idle().await;
        self.shared.resolver.shutdown().await;
        debug!("Image request manager shut down");
    }
}

impl std::fmt::Debug for RequestLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLifecycleManager")
            .field("debounce", &self.shared.debounce)
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

/// Clears the flushing flag if a binding panics mid-flush.
struct FlushGuard<'a> {
    writes: &'a Mutex<WriteQueue>,
    armed: bool,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.writes.lock().flushing = false;
        }
    }
}

impl Shared {
    async fn run(self: Arc<Self>, request: LoadRequest, token: CancellationToken) {
        if token.is_cancelled() {
            trace!(target = %request.target, "Request superseded before start");
            return;
        }

        tokio::select! {
            () = token.cancelled() => {
                trace!(target = %request.target, reference = %request.reference, "Request superseded during debounce");
                return;
            }
            () = tokio::time::sleep(self.debounce) => {}
        }

        let result = self
            .resolver
            .resolve(&request.reference, request.dimensions)
            .await;

        self.complete(&request, &token, result);
    }

    fn complete(&self, request: &LoadRequest, token: &CancellationToken, result: Option<LoadedImage>) {
        let target = request.target;
        {
            let mut registry = self.registry.lock();

            let is_current = !token.is_cancelled()
                && registry
                    .get(&target)
                    .is_some_and(|registered| registered.same_as(token));
            if !is_current {
                debug!(target = %target, reference = %request.reference, "Discarding superseded result");
                return;
            }

            registry.remove(&target);
            let mut writes = self.writes.lock();
            match result {
                Some(loaded) => {
                    debug!(target = %target, reference = %request.reference, source = %loaded.source, "Applying loaded image");
                    writes
                        .pending
                        .push_back(DisplayWrite::Image(target, Some(loaded.image)));
                }
                None => {
                    debug!(target = %target, reference = %request.reference, "No image available");
                }
            }
            writes.pending.push_back(DisplayWrite::Loading(target, false));
        }
        self.flush();
    }

    /// Applies queued display writes in decision order, outside the registry
    /// lock. Writes queued by a re-entrant call, or by another thread while a
    /// flush is running, are applied by the flush already in progress.
    fn flush(&self) {
        {
            let mut writes = self.writes.lock();
            if writes.flushing {
                return;
            }
            writes.flushing = true;
        }
        let mut guard = FlushGuard {
            writes: &self.writes,
            armed: true,
        };

        loop {
            let next = {
                let mut writes = self.writes.lock();
                let next = writes.pending.pop_front();
                if next.is_none() {
                    // Hand off under the lock so a concurrent enqueue either
                    // lands before this check or starts its own flush.
                    writes.flushing = false;
                }
                next
            };
            match next {
                Some(DisplayWrite::Image(target, image)) => self.display.set_image(target, image),
                Some(DisplayWrite::Loading(target, loading)) => {
                    self.display.set_loading(target, loading);
                }
                None => {
                    guard.armed = false;
                    return;
                }
            }
        }
    }
}
