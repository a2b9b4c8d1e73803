use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use super::{PoseSource, Skeleton};
use crate::{Result, SketchError};

/// The single shared "latest skeleton" slot.
///
/// The detector replaces the whole snapshot on every completed detection and
/// the render tick reads whatever is there. Readers hold an `Arc` to an
/// immutable skeleton, so they never observe a half-written update.
#[derive(Debug, Clone, Default)]
pub struct LatestSkeleton {
    shared: Arc<Mutex<Option<Arc<Skeleton>>>>,
}

impl LatestSkeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the slot contents. `None` means nobody is in view.
    pub fn publish(&self, skeleton: Option<Skeleton>) -> Result<()> {
        let mut slot = self.lock()?;
        *slot = skeleton.map(Arc::new);
        Ok(())
    }

    /// Publishes the first body of a detection batch.
    pub fn publish_batch(&self, batch: Vec<Skeleton>) -> Result<()> {
        self.publish(batch.into_iter().next())
    }

    pub fn try_snapshot(&self) -> Result<Option<Arc<Skeleton>>> {
        let slot = self.lock()?;
        Ok(slot.clone())
    }

    /// Current snapshot, stale or fresh. A poisoned slot reads as empty.
    pub fn snapshot(&self) -> Option<Arc<Skeleton>> {
        self.try_snapshot().unwrap_or_else(|err| {
            tracing::warn!(%err, "reading skeleton slot failed, treating as no pose");
            None
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Arc<Skeleton>>>> {
        self.shared
            .lock()
            .map_err(|_| SketchError::Poisoned("latest skeleton slot"))
    }
}

/// Runs a [`PoseSource`] in the background, publishing into a slot.
pub struct Detector;

impl Detector {
    /// Starts detecting on a dedicated thread. Detection continues until the
    /// source is exhausted or the handle is stopped.
    pub fn spawn<S>(mut source: S, slot: LatestSkeleton, interval: Duration) -> DetectorHandle
    where
        S: PoseSource + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();

        let thread = thread::spawn(move || {
            tracing::info!(?interval, "pose detector started");
            let mut detections = 0_u64;
            while flag.load(Ordering::Relaxed) {
                let Some(batch) = source.detect() else {
                    break;
                };
                if let Err(err) = slot.publish_batch(batch) {
                    tracing::warn!(%err, "dropping detection");
                    break;
                }
                detections += 1;
                if !interval.is_zero() {
                    thread::sleep(interval);
                }
            }
            tracing::info!(detections, "pose detector stopped");
            detections
        });

        DetectorHandle {
            running,
            thread: Some(thread),
        }
    }
}

/// Owner handle for a background detector thread.
#[derive(Debug)]
pub struct DetectorHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<u64>>,
}

impl DetectorHandle {
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map(|thread| !thread.is_finished())
            .unwrap_or(false)
    }

    /// Stops the detector and returns how many detections it published.
    pub fn stop(mut self) -> Result<u64> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<u64> {
        self.running.store(false, Ordering::Relaxed);
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| SketchError::msg("pose detector thread panicked")),
            None => Ok(0),
        }
    }
}

impl Drop for DetectorHandle {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
