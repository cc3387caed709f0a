use std::{
    ops::ControlFlow,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
    },
    thread::JoinHandle,
};

use crate::{
    blend::{Weights, blend_with_checkpoints, line_percent},
    error::{CrossfadeError, CrossfadeResult},
    io::FrameWriter,
    source::SourcePair,
};

/// Cooperative stop flag shared between a job handle and its worker thread.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Everything a running job reports. Events for one job arrive in the order
/// `Progress*`, `Saving`, `Saved`, `Done`; a cancelled job skips straight to `Done`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobEvent {
    Progress { filename: String, percent: u8 },
    Saving { filename: String },
    Saved { filename: String, ok: bool },
    Done { filename: String },
}

impl JobEvent {
    pub fn filename(&self) -> &str {
        match self {
            Self::Progress { filename, .. }
            | Self::Saving { filename }
            | Self::Saved { filename, .. }
            | Self::Done { filename } => filename,
        }
    }
}

/// One blended frame computed on its own thread and written to `path`.
pub struct FrameJob {
    worker: Option<Worker>,
    filename: String,
    path: PathBuf,
    weights: Weights,
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl FrameJob {
    pub fn new(
        path: impl Into<PathBuf>,
        sources: SourcePair,
        weights: Weights,
        writer: Arc<dyn FrameWriter>,
        events: Sender<JobEvent>,
    ) -> CrossfadeResult<Self> {
        weights.validate()?;
        let path = path.into();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                CrossfadeError::validation(format!(
                    "frame path '{}' has no file name",
                    path.display()
                ))
            })?;
        let cancel = CancelToken::new();

        Ok(Self {
            worker: Some(Worker {
                filename: filename.clone(),
                path: path.clone(),
                sources,
                weights,
                writer,
                events,
                cancel: cancel.clone(),
            }),
            filename,
            path,
            weights,
            cancel,
            handle: None,
        })
    }

    /// Spawn the worker thread. Never blocks on the blend itself.
    pub fn start(&mut self) -> CrossfadeResult<()> {
        let worker = self
            .worker
            .take()
            .ok_or_else(|| CrossfadeError::job(format!("'{}' already started", self.filename)))?;

        let handle = std::thread::Builder::new()
            .name(format!("crossfade-{}", self.filename))
            .spawn(move || worker.run())
            .map_err(|e| {
                CrossfadeError::job(format!("spawn worker for '{}': {e}", self.filename))
            })?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Request a stop; takes effect at the worker's next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Block until the worker thread has exited. A no-op for jobs never started.
    pub fn wait(&mut self) -> CrossfadeResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        handle.join().map_err(|_| {
            tracing::error!(filename = %self.filename, "frame worker panicked");
            CrossfadeError::job(format!("worker for '{}' panicked", self.filename))
        })
    }

    pub fn is_started(&self) -> bool {
        self.worker.is_none()
    }

    /// True once a started job's thread has exited (joined or not).
    pub fn is_finished(&self) -> bool {
        self.is_started() && self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn weights(&self) -> Weights {
        self.weights
    }
}

impl Drop for FrameJob {
    fn drop(&mut self) {
        self.cancel();
        let _ = self.wait();
    }
}

struct Worker {
    filename: String,
    path: PathBuf,
    sources: SourcePair,
    weights: Weights,
    writer: Arc<dyn FrameWriter>,
    events: Sender<JobEvent>,
    cancel: CancelToken,
}

impl Worker {
    #[tracing::instrument(skip(self), fields(filename = %self.filename))]
    fn run(self) {
        let _done = DoneGuard {
            filename: self.filename.clone(),
            events: self.events.clone(),
        };

        if self.cancel.is_cancelled() {
            tracing::debug!("cancelled before start");
            return;
        }
        self.progress(0);

        let mut last_percent = 0u8;
        let blended = blend_with_checkpoints(
            self.sources.first(),
            self.sources.last(),
            self.weights,
            |line, lines| {
                if self.cancel.is_cancelled() {
                    return ControlFlow::Break(());
                }
                let percent = line_percent(line, lines);
                if percent > last_percent {
                    last_percent = percent;
                    self.progress(percent);
                }
                ControlFlow::Continue(())
            },
        );

        let image = match blended {
            Ok(Some(image)) => image,
            Ok(None) => {
                tracing::debug!("cancelled during blend");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "blend rejected prepared sources");
                return;
            }
        };
        if last_percent < 100 {
            self.progress(100);
        }

        if self.cancel.is_cancelled() {
            return;
        }
        self.emit(JobEvent::Saving {
            filename: self.filename.clone(),
        });

        if self.cancel.is_cancelled() {
            return;
        }
        let ok = match self.writer.write(&image, &self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "frame written");
                true
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to save frame");
                false
            }
        };

        if self.cancel.is_cancelled() {
            return;
        }
        self.emit(JobEvent::Saved {
            filename: self.filename.clone(),
            ok,
        });
    }

    fn progress(&self, percent: u8) {
        self.emit(JobEvent::Progress {
            filename: self.filename.clone(),
            percent,
        });
    }

    fn emit(&self, event: JobEvent) {
        // The observer may have gone away; the job still runs to its end.
        let _ = self.events.send(event);
    }
}

/// Sends `Done` when the worker exits, including by unwinding.
struct DoneGuard {
    filename: String,
    events: Sender<JobEvent>,
}

impl Drop for DoneGuard {
    fn drop(&mut self) {
        let _ = self.events.send(JobEvent::Done {
            filename: std::mem::take(&mut self.filename),
        });
    }
}
