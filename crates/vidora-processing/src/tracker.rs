//! Timed progress tracker.
//!
//! One background task per resource advances its progress by
//! [`PROGRESS_STEP_PERCENT`] every tick. Each write is a compare-and-set
//! against the last value this task persisted, so a stale or duplicate task can
//! never move progress backwards or overwrite a terminal state.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use vidora_core::constants::{PROGRESS_COMPLETE_PERCENT, PROGRESS_STEP_PERCENT};
use vidora_core::models::MediaResource;
use vidora_core::AppError;
use vidora_db::MediaStore;

use crate::classifier::ClassificationPolicy;
use crate::events::{NotificationSink, ProgressEvent};

struct TrackerHandle {
    run_id: Uuid,
    cancel: CancellationToken,
}

type Registry = Arc<Mutex<HashMap<Uuid, TrackerHandle>>>;

fn lock_registry(registry: &Registry) -> MutexGuard<'_, HashMap<Uuid, TrackerHandle>> {
    // Handles hold no invariants a panicking holder could break
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

enum StepOutcome {
    Advanced(i32),
    Completed,
    Stopped,
}

/// Run a store write unless the tracker is cancelled first. `None` means cancelled.
async fn unless_cancelled<F>(cancel: &CancellationToken, write: F) -> Option<Result<bool, AppError>>
where
    F: Future<Output = Result<bool, AppError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = write => Some(result),
    }
}

/// Owns the live per-resource tracking tasks.
#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn MediaStore>,
    classifier: Arc<dyn ClassificationPolicy>,
    tick: Duration,
    tasks: Registry,
}

impl ProgressTracker {
    pub fn new(
        store: Arc<dyn MediaStore>,
        classifier: Arc<dyn ClassificationPolicy>,
        tick: Duration,
    ) -> Self {
        Self {
            store,
            classifier,
            tick,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Move a pending resource to `processing` and schedule its advancement.
    ///
    /// Emits `started` before returning. Fails with `NotFound` for an unknown
    /// id and `InvalidState` if the resource is not pending.
    #[tracing::instrument(skip(self, sink), fields(video_id = %resource_id))]
    pub async fn start(
        &self,
        resource_id: Uuid,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<MediaResource, AppError> {
        let resource = match self.store.begin_processing(resource_id).await? {
            Some(resource) => resource,
            None => {
                return match self.store.get(resource_id).await? {
                    None => Err(AppError::NotFound(resource_id.to_string())),
                    Some(existing) => Err(AppError::InvalidState(format!(
                        "video {} is {}, expected pending",
                        resource_id, existing.status
                    ))),
                };
            }
        };

        tracing::info!(
            video_id = %resource_id,
            owner_id = %resource.owner_id,
            "Processing started"
        );
        sink.publish(ProgressEvent::Started {
            resource_id,
            owner_id: resource.owner_id,
        });

        let handle = TrackerHandle {
            run_id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
        };
        let run_id = handle.run_id;
        let cancel = handle.cancel.clone();

        if let Some(previous) = lock_registry(&self.tasks).insert(resource_id, handle) {
            tracing::warn!(video_id = %resource_id, "Replacing a live tracker");
            previous.cancel.cancel();
        }

        let worker = self.clone();
        let owner_id = resource.owner_id;
        tokio::spawn(async move {
            worker
                .run(resource_id, owner_id, run_id, cancel, sink)
                .await;
        });

        Ok(resource)
    }

    /// Cancel a live tracker. Returns whether one was running.
    ///
    /// The resource keeps whatever status and progress it had reached.
    pub fn stop(&self, resource_id: Uuid) -> bool {
        match lock_registry(&self.tasks).remove(&resource_id) {
            Some(handle) => {
                handle.cancel.cancel();
                tracing::info!(video_id = %resource_id, "Tracker stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, resource_id: Uuid) -> bool {
        lock_registry(&self.tasks).contains_key(&resource_id)
    }

    pub fn running_count(&self) -> usize {
        lock_registry(&self.tasks).len()
    }

    /// Cancel every live tracker. Returns how many were running.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<(Uuid, TrackerHandle)> = lock_registry(&self.tasks).drain().collect();
        for (_, handle) in &drained {
            handle.cancel.cancel();
        }
        if !drained.is_empty() {
            tracing::info!(count = drained.len(), "Cancelled live trackers");
        }
        drained.len()
    }

    async fn run(
        &self,
        resource_id: Uuid,
        owner_id: Uuid,
        run_id: Uuid,
        cancel: CancellationToken,
        sink: Arc<dyn NotificationSink>,
    ) {
        let mut interval = interval_at(Instant::now() + self.tick, self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut progress = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(video_id = %resource_id, progress, "Tracker cancelled");
                    return;
                }
                _ = interval.tick() => {
                    match self.step(resource_id, owner_id, progress, &cancel, sink.as_ref()).await {
                        Ok(StepOutcome::Advanced(next)) => progress = next,
                        Ok(StepOutcome::Completed) => break,
                        Ok(StepOutcome::Stopped) => {
                            tracing::debug!(video_id = %resource_id, progress, "Tracker cancelled mid-step");
                            return;
                        }
                        Err(e) => {
                            self.fail(resource_id, progress, e, &cancel).await;
                            break;
                        }
                    }
                }
            }
        }

        let mut tasks = lock_registry(&self.tasks);
        if tasks.get(&resource_id).map(|h| h.run_id) == Some(run_id) {
            tasks.remove(&resource_id);
        }
    }

    async fn step(
        &self,
        resource_id: Uuid,
        owner_id: Uuid,
        progress: i32,
        cancel: &CancellationToken,
        sink: &dyn NotificationSink,
    ) -> Result<StepOutcome, AppError> {
        let next = (progress + PROGRESS_STEP_PERCENT).min(PROGRESS_COMPLETE_PERCENT);

        if next < PROGRESS_COMPLETE_PERCENT {
            let write = self.store.advance_progress(resource_id, progress, next);
            let Some(result) = unless_cancelled(cancel, write).await else {
                return Ok(StepOutcome::Stopped);
            };
            let applied = result.map_err(|e| AppError::TrackerPersist(e.to_string()))?;
            if !applied {
                return Err(AppError::TrackerPersist(format!(
                    "progress {} -> {} rejected",
                    progress, next
                )));
            }
            // Stopped while the write was in flight
            if cancel.is_cancelled() {
                return Ok(StepOutcome::Stopped);
            }

            tracing::info!(video_id = %resource_id, progress = next, "Processing progress");
            sink.publish(ProgressEvent::Progress {
                resource_id,
                owner_id,
                progress: next,
            });
            return Ok(StepOutcome::Advanced(next));
        }

        let classification = self.classifier.classify(resource_id);
        let write = self.store.complete(resource_id, progress, classification);
        let Some(result) = unless_cancelled(cancel, write).await else {
            return Ok(StepOutcome::Stopped);
        };
        let applied = result.map_err(|e| AppError::TrackerPersist(e.to_string()))?;
        if !applied {
            return Err(AppError::TrackerPersist(format!(
                "completion from {} rejected",
                progress
            )));
        }
        if cancel.is_cancelled() {
            return Ok(StepOutcome::Stopped);
        }

        tracing::info!(
            video_id = %resource_id,
            classification = %classification,
            "Processing complete"
        );
        sink.publish(ProgressEvent::Progress {
            resource_id,
            owner_id,
            progress: PROGRESS_COMPLETE_PERCENT,
        });
        sink.publish(ProgressEvent::Completed {
            resource_id,
            owner_id,
            classification,
        });
        Ok(StepOutcome::Completed)
    }

    async fn fail(&self, resource_id: Uuid, progress: i32, cause: AppError, cancel: &CancellationToken) {
        tracing::error!(
            video_id = %resource_id,
            progress,
            error = %cause,
            "Processing step failed, marking video as failed"
        );
        let Some(result) = unless_cancelled(cancel, self.store.mark_failed(resource_id)).await else {
            tracing::debug!(video_id = %resource_id, "Tracker stopped, video left as is");
            return;
        };
        match result {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(video_id = %resource_id, "Video already terminal, not marked failed")
            }
            Err(e) => {
                tracing::error!(video_id = %resource_id, error = %e, "Failed to mark video as failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FixedClassifier;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicI32, Ordering};
    use tokio::sync::Notify;
    use vidora_core::models::{Classification, NewMediaResource, ResourceStatus};
    use vidora_db::InMemoryMediaStore;

    const TICK: Duration = Duration::from_millis(1000);

    #[derive(Clone, Default)]
    struct RecordingSink {
        events: Arc<Mutex<Vec<ProgressEvent>>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<ProgressEvent> {
            self.events.lock().unwrap().clone()
        }

        fn names(&self) -> Vec<&'static str> {
            self.events().iter().map(|e| e.name()).collect()
        }
    }

    impl NotificationSink for RecordingSink {
        fn publish(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    /// Delegates to the memory store but errors once progress would exceed a limit.
    struct FailingStore {
        inner: InMemoryMediaStore,
        fail_above: AtomicI32,
    }

    #[async_trait]
    impl MediaStore for FailingStore {
        async fn create(&self, new: NewMediaResource) -> Result<MediaResource, AppError> {
            self.inner.create(new).await
        }
        async fn get(&self, id: Uuid) -> Result<Option<MediaResource>, AppError> {
            self.inner.get(id).await
        }
        async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<MediaResource>, AppError> {
            self.inner.list_by_owner(owner_id).await
        }
        async fn begin_processing(&self, id: Uuid) -> Result<Option<MediaResource>, AppError> {
            self.inner.begin_processing(id).await
        }
        async fn advance_progress(&self, id: Uuid, from: i32, to: i32) -> Result<bool, AppError> {
            if to > self.fail_above.load(Ordering::SeqCst) {
                return Err(AppError::Internal("connection reset".to_string()));
            }
            self.inner.advance_progress(id, from, to).await
        }
        async fn complete(
            &self,
            id: Uuid,
            from: i32,
            classification: Classification,
        ) -> Result<bool, AppError> {
            self.inner.complete(id, from, classification).await
        }
        async fn mark_failed(&self, id: Uuid) -> Result<bool, AppError> {
            self.inner.mark_failed(id).await
        }
    }

    /// Delegates to the memory store but parks a write until released.
    struct GatedStore {
        inner: InMemoryMediaStore,
        gate_progress_at: i32,
        gate_completion: bool,
        entered: Notify,
        release: Notify,
    }

    impl GatedStore {
        fn new(gate_progress_at: i32, gate_completion: bool) -> Self {
            Self {
                inner: InMemoryMediaStore::new(),
                gate_progress_at,
                gate_completion,
                entered: Notify::new(),
                release: Notify::new(),
            }
        }

        async fn hold(&self) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }

    #[async_trait]
    impl MediaStore for GatedStore {
        async fn create(&self, new: NewMediaResource) -> Result<MediaResource, AppError> {
            self.inner.create(new).await
        }
        async fn get(&self, id: Uuid) -> Result<Option<MediaResource>, AppError> {
            self.inner.get(id).await
        }
        async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<MediaResource>, AppError> {
            self.inner.list_by_owner(owner_id).await
        }
        async fn begin_processing(&self, id: Uuid) -> Result<Option<MediaResource>, AppError> {
            self.inner.begin_processing(id).await
        }
        async fn advance_progress(&self, id: Uuid, from: i32, to: i32) -> Result<bool, AppError> {
            if to == self.gate_progress_at {
                self.hold().await;
            }
            self.inner.advance_progress(id, from, to).await
        }
        async fn complete(
            &self,
            id: Uuid,
            from: i32,
            classification: Classification,
        ) -> Result<bool, AppError> {
            if self.gate_completion {
                self.hold().await;
            }
            self.inner.complete(id, from, classification).await
        }
        async fn mark_failed(&self, id: Uuid) -> Result<bool, AppError> {
            self.inner.mark_failed(id).await
        }
    }

    async fn pending_resource(store: &dyn MediaStore) -> MediaResource {
        let new = NewMediaResource::new("clip", "videos/clip.mp4", None, 64, Uuid::new_v4())
            .unwrap();
        store.create(new).await.unwrap()
    }

    fn tracker_with(store: Arc<dyn MediaStore>) -> ProgressTracker {
        ProgressTracker::new(store, Arc::new(FixedClassifier(Classification::Safe)), TICK)
    }

    async fn advance(duration: Duration) {
        tokio::time::sleep(duration).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_to_completion() {
        let store = Arc::new(InMemoryMediaStore::new());
        let tracker = tracker_with(store.clone());
        let sink = RecordingSink::default();
        let resource = pending_resource(store.as_ref()).await;

        let started = tracker
            .start(resource.id, Arc::new(sink.clone()))
            .await
            .unwrap();
        assert_eq!(started.status, ResourceStatus::Processing);
        assert_eq!(started.progress_percent, 0);
        assert!(tracker.is_running(resource.id));

        advance(TICK * 5 + Duration::from_millis(10)).await;

        assert_eq!(
            sink.names(),
            vec!["started", "progress", "progress", "progress", "progress", "progress", "completed"]
        );
        let progress: Vec<i32> = sink
            .events()
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Progress { progress, .. } => Some(*progress),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![20, 40, 60, 80, 100]);

        let stored = store.get(resource.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ResourceStatus::Complete);
        assert_eq!(stored.progress_percent, 100);
        assert_eq!(stored.classification, Some(Classification::Safe));
        assert!(stored.check_invariants().is_ok());
        assert!(!tracker.is_running(resource.id));
        assert!(!tracker.stop(resource.id));

        advance(TICK * 3).await;
        assert_eq!(sink.events().len(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persist_failure_marks_failed_and_goes_quiet() {
        let store = Arc::new(FailingStore {
            inner: InMemoryMediaStore::new(),
            fail_above: AtomicI32::new(40),
        });
        let tracker = tracker_with(store.clone());
        let sink = RecordingSink::default();
        let resource = pending_resource(store.as_ref()).await;

        tracker
            .start(resource.id, Arc::new(sink.clone()))
            .await
            .unwrap();
        advance(TICK * 6).await;

        assert_eq!(sink.names(), vec!["started", "progress", "progress"]);
        let stored = store.get(resource.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ResourceStatus::Failed);
        assert_eq!(stored.progress_percent, 40);
        assert!(stored.classification.is_none());
        assert!(!tracker.is_running(resource.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_write_stops_tracker() {
        let store = Arc::new(InMemoryMediaStore::new());
        let tracker = tracker_with(store.clone());
        let sink = RecordingSink::default();
        let resource = pending_resource(store.as_ref()).await;

        tracker
            .start(resource.id, Arc::new(sink.clone()))
            .await
            .unwrap();
        advance(TICK + Duration::from_millis(10)).await;

        // Another writer moves progress underneath the tracker
        assert!(store.advance_progress(resource.id, 20, 60).await.unwrap());
        advance(TICK * 5).await;

        let stored = store.get(resource.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ResourceStatus::Failed);
        assert_eq!(stored.progress_percent, 60);
        assert_eq!(sink.names(), vec!["started", "progress"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_before_completion() {
        let store = Arc::new(InMemoryMediaStore::new());
        let tracker = tracker_with(store.clone());
        let sink = RecordingSink::default();
        let resource = pending_resource(store.as_ref()).await;

        tracker
            .start(resource.id, Arc::new(sink.clone()))
            .await
            .unwrap();
        advance(TICK * 2 + Duration::from_millis(10)).await;

        assert!(tracker.stop(resource.id));
        assert!(!tracker.stop(resource.id));
        advance(TICK * 5).await;

        assert_eq!(sink.names(), vec!["started", "progress", "progress"]);
        let stored = store.get(resource.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ResourceStatus::Processing);
        assert_eq!(stored.progress_percent, 40);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_requires_pending_resource() {
        let store = Arc::new(InMemoryMediaStore::new());
        let tracker = tracker_with(store.clone());
        let resource = pending_resource(store.as_ref()).await;
        let sink: Arc<dyn NotificationSink> = Arc::new(RecordingSink::default());

        tracker.start(resource.id, sink.clone()).await.unwrap();
        assert!(matches!(
            tracker.start(resource.id, sink.clone()).await,
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(
            tracker.start(Uuid::new_v4(), sink).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(tracker.running_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_everything() {
        let store = Arc::new(InMemoryMediaStore::new());
        let tracker = tracker_with(store.clone());
        let sink = RecordingSink::default();

        for _ in 0..3 {
            let resource = pending_resource(store.as_ref()).await;
            tracker
                .start(resource.id, Arc::new(sink.clone()))
                .await
                .unwrap();
        }
        assert_eq!(tracker.shutdown(), 3);
        assert_eq!(tracker.running_count(), 0);

        advance(TICK * 5).await;
        assert_eq!(sink.names(), vec!["started", "started", "started"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closure_sink() {
        let store = Arc::new(InMemoryMediaStore::new());
        let tracker = tracker_with(store.clone());
        let resource = pending_resource(store.as_ref()).await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_sink = seen.clone();

        let sink = move |event: ProgressEvent| seen_by_sink.lock().unwrap().push(event.name());
        tracker.start(resource.id, Arc::new(sink)).await.unwrap();
        advance(TICK * 5 + Duration::from_millis(10)).await;

        assert_eq!(seen.lock().unwrap().last(), Some(&"completed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_progress_write_discards_it() {
        let store = Arc::new(GatedStore::new(60, false));
        let tracker = tracker_with(store.clone());
        let sink = RecordingSink::default();
        let resource = pending_resource(store.as_ref()).await;

        tracker
            .start(resource.id, Arc::new(sink.clone()))
            .await
            .unwrap();
        store.entered.notified().await;

        assert!(tracker.stop(resource.id));
        store.release.notify_one();
        advance(TICK * 5).await;

        assert_eq!(sink.names(), vec!["started", "progress", "progress"]);
        let stored = store.get(resource.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ResourceStatus::Processing);
        assert_eq!(stored.progress_percent, 40);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_completion_write_leaves_video_processing() {
        let store = Arc::new(GatedStore::new(-1, true));
        let tracker = tracker_with(store.clone());
        let sink = RecordingSink::default();
        let resource = pending_resource(store.as_ref()).await;

        tracker
            .start(resource.id, Arc::new(sink.clone()))
            .await
            .unwrap();
        store.entered.notified().await;

        assert!(tracker.stop(resource.id));
        store.release.notify_one();
        advance(TICK * 5).await;

        assert_eq!(
            sink.names(),
            vec!["started", "progress", "progress", "progress", "progress"]
        );
        let stored = store.get(resource.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ResourceStatus::Processing);
        assert_eq!(stored.progress_percent, 80);
        assert!(stored.classification.is_none());
        assert!(!tracker.is_running(resource.id));
    }
}
