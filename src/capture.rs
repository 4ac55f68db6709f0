//! The two-shot capture workflow.
//!
//! ```text
//!            start_capture            photo_captured            photo_captured
//!  Ready ─────────────────▶ TakingFirstPhoto ──────────▶ TakingSecondPhoto ──────────▶ Compositing
//!    ▲                                                                                   │
//!    │                       poll / wait: error                                          │
//!    ├───────────────────────────────────────────────────────────────────────────────────┤
//!    │                                                                                   ▼
//!    └──────────────────────────────── reset ◀──────────────────────────────────── Complete(id)
//! ```
//!
//! `cancel` returns to `Ready` from any state.
//!
//! Persisting the second shot is slow (two full-resolution JPEG encodes plus
//! the composite), so it runs on a dedicated worker thread. The worker only
//! computes: it builds the record and hands it back over a channel. The
//! caller collects it with [`CaptureSession::poll`] or
//! [`CaptureSession::wait`], and only then is the [`PhotoStore`] touched,
//! on the caller's thread.
//!
//! Cancelling while compositing does not stop the worker. Each capture
//! carries a generation number; a result from an older generation is
//! discarded when it arrives and its directory is removed from disk.

use crate::error::{Error, Result};
use crate::imaging::Photo;
use crate::record::StereogramRecord;
use crate::services::Services;
use crate::store::PhotoStore;
use crate::types::RecordId;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

/// Camera hardware as seen by the session.
pub trait Camera {
    fn is_available(&self) -> bool;
}

/// Callbacks fired on the caller's thread. All default to no-ops.
pub trait CaptureObserver {
    /// The user should now take photo `photo_number` (1 or 2).
    fn on_progress(&mut self, _photo_number: u8) {}
    fn on_complete(&mut self, _record: &StereogramRecord) {}
    fn on_cancelled(&mut self) {}
    fn on_error(&mut self, _error: &Error) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CaptureObserver for NoopObserver {}

#[derive(Debug)]
pub enum CaptureState {
    Ready,
    TakingFirstPhoto,
    TakingSecondPhoto { first: Photo },
    /// The worker is persisting and compositing.
    Compositing,
    Complete(RecordId),
}

impl CaptureState {
    pub fn name(&self) -> &'static str {
        match self {
            CaptureState::Ready => "ready",
            CaptureState::TakingFirstPhoto => "taking-first-photo",
            CaptureState::TakingSecondPhoto { .. } => "taking-second-photo",
            CaptureState::Compositing => "compositing",
            CaptureState::Complete(_) => "complete",
        }
    }
}

/// What a worker sends back.
struct Outcome {
    generation: u64,
    result: Result<StereogramRecord>,
}

pub struct CaptureSession {
    state: CaptureState,
    camera: Box<dyn Camera>,
    root: PathBuf,
    services: Services,
    generation: u64,
    pending: usize,
    sender: Sender<Outcome>,
    receiver: Receiver<Outcome>,
}

impl CaptureSession {
    /// A session that stores its results in `store`'s root.
    pub fn new(camera: Box<dyn Camera>, store: &PhotoStore) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            state: CaptureState::Ready,
            camera,
            root: store.root().to_path_buf(),
            services: store.services().clone(),
            generation: 0,
            pending: 0,
            sender,
            receiver,
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    /// Workers still running, including ones whose result will be discarded.
    pub fn pending_workers(&self) -> usize {
        self.pending
    }

    /// Begin a capture.
    ///
    /// # Panics
    ///
    /// When a capture is already in progress. Callers must not re-enter.
    pub fn start_capture(&mut self, observer: &mut dyn CaptureObserver) -> Result<()> {
        match self.state {
            CaptureState::Ready | CaptureState::Complete(_) => {}
            ref busy => panic!("start_capture called while {}", busy.name()),
        }
        if !self.camera.is_available() {
            return Err(Error::NoCameraAvailable);
        }

        self.state = CaptureState::TakingFirstPhoto;
        log::debug!("event=capture_started module=capture");
        observer.on_progress(1);
        Ok(())
    }

    /// Feed a photo from the camera.
    ///
    /// The first photo is held in memory; the second one dispatches the
    /// worker. Photos arriving in any other state are ignored.
    ///
    /// # Panics
    ///
    /// When the second photo's scale factor differs from the first's.
    pub fn photo_captured(&mut self, photo: Photo, observer: &mut dyn CaptureObserver) {
        match std::mem::replace(&mut self.state, CaptureState::Ready) {
            CaptureState::TakingFirstPhoto => {
                self.state = CaptureState::TakingSecondPhoto { first: photo };
                observer.on_progress(2);
            }
            CaptureState::TakingSecondPhoto { first } => {
                assert_eq!(
                    first.scale(),
                    photo.scale(),
                    "stereogram halves must share the same scale factor"
                );
                match self.spawn_worker(first, photo) {
                    Ok(()) => self.state = CaptureState::Compositing,
                    Err(err) => observer.on_error(&err),
                }
            }
            other => {
                log::warn!(
                    "event=photo_ignored module=capture state={}",
                    other.name()
                );
                self.state = other;
            }
        }
    }

    fn spawn_worker(&mut self, left: Photo, right: Photo) -> Result<()> {
        let generation = self.generation;
        let sender = self.sender.clone();
        let root = self.root.clone();
        let services = self.services.clone();

        thread::Builder::new()
            .name("stereocam-compositor".into())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    build_record(left, right, &root, &services)
                }))
                .unwrap_or_else(|_| {
                    Err(Error::Unknown("compositing worker panicked".to_string()))
                });
                // The session may be gone already; nobody left to tell
                let _ = sender.send(Outcome { generation, result });
            })
            .map_err(|e| Error::Unknown(format!("could not start compositing worker: {e}")))?;

        self.pending += 1;
        log::debug!(
            "event=worker_spawned module=capture generation={}",
            generation
        );
        Ok(())
    }

    /// Return to `Ready` from any state, dropping a held first photo.
    ///
    /// A running worker keeps going; its result is discarded on arrival.
    pub fn cancel(&mut self, observer: &mut dyn CaptureObserver) {
        let previous = std::mem::replace(&mut self.state, CaptureState::Ready);
        match previous {
            CaptureState::Ready | CaptureState::Complete(_) => {}
            CaptureState::Compositing => {
                self.generation += 1;
                log::info!(
                    "event=capture_cancelled module=capture state=compositing generation={}",
                    self.generation
                );
                observer.on_cancelled();
            }
            other => {
                log::info!(
                    "event=capture_cancelled module=capture state={}",
                    other.name()
                );
                observer.on_cancelled();
            }
        }
    }

    /// Leave `Complete` for `Ready`. The stored record is unaffected.
    /// Returns whether the state changed.
    pub fn reset(&mut self) -> bool {
        if matches!(self.state, CaptureState::Complete(_)) {
            self.state = CaptureState::Ready;
            true
        } else {
            false
        }
    }

    /// Collect every finished worker result without blocking.
    ///
    /// Returns `true` when the current capture finished (successfully or not).
    pub fn poll(&mut self, store: &mut PhotoStore, observer: &mut dyn CaptureObserver) -> bool {
        let mut finished = false;
        while self.pending > 0 {
            match self.receiver.try_recv() {
                Ok(outcome) => finished |= self.deliver(outcome, store, observer),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        finished
    }

    /// Block until the current capture finishes.
    ///
    /// Stale results that arrive first are discarded along the way. Returns
    /// immediately when nothing is compositing.
    pub fn wait(&mut self, store: &mut PhotoStore, observer: &mut dyn CaptureObserver) {
        while matches!(self.state, CaptureState::Compositing) && self.pending > 0 {
            match self.receiver.recv() {
                Ok(outcome) => {
                    self.deliver(outcome, store, observer);
                }
                Err(_) => break,
            }
        }
    }

    fn deliver(
        &mut self,
        outcome: Outcome,
        store: &mut PhotoStore,
        observer: &mut dyn CaptureObserver,
    ) -> bool {
        self.pending = self.pending.saturating_sub(1);

        if outcome.generation != self.generation
            || !matches!(self.state, CaptureState::Compositing)
        {
            discard(outcome);
            return false;
        }

        let added = outcome.result.and_then(|record| adopt(record, store));
        match added {
            Ok(index) => {
                let record = &store.records()[index];
                log::info!(
                    "event=capture_complete module=capture id={}",
                    record.id()
                );
                self.state = CaptureState::Complete(record.id().clone());
                observer.on_complete(record);
            }
            Err(err) => {
                log::warn!("event=capture_failed module=capture reason={}", err);
                self.state = CaptureState::Ready;
                observer.on_error(&err);
            }
        }
        true
    }
}

/// Worker body: persist both halves, then warm the composite cache.
fn build_record(
    left: Photo,
    right: Photo,
    root: &std::path::Path,
    services: &Services,
) -> Result<StereogramRecord> {
    let record = StereogramRecord::create(left, right, root, services)?;
    if let Err(err) = record.composite_image() {
        log::debug!(
            "event=composite_warmup_failed module=capture id={} reason={}",
            record.id(),
            err
        );
    }
    Ok(record)
}

/// Add a finished record to `store`. A record the store refuses is removed
/// from disk so no orphan directory is left behind.
fn adopt(mut record: StereogramRecord, store: &mut PhotoStore) -> Result<usize> {
    if let Err(err) = store.check_under_root(&record) {
        remove_persisted(&mut record);
        return Err(err);
    }
    store.add(record)
}

fn remove_persisted(record: &mut StereogramRecord) {
    if let Err(err) = record.delete_from_disk() {
        log::warn!(
            "event=cleanup_failed module=capture path={} reason={}",
            record.base_dir().display(),
            err
        );
    }
}

/// Drop a result nobody is waiting for, removing what it persisted.
fn discard(outcome: Outcome) {
    match outcome.result {
        Ok(mut record) => {
            log::warn!(
                "event=capture_result_discarded module=capture id={} generation={}",
                record.id(),
                outcome.generation
            );
            remove_persisted(&mut record);
        }
        Err(err) => {
            log::debug!(
                "event=capture_error_discarded module=capture generation={} reason={}",
                outcome.generation,
                err
            );
        }
    }
}
