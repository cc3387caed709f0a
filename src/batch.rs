use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::{
        Arc,
        mpsc::{self, Receiver},
    },
};

use crate::{
    blend::frame_weights,
    error::{CrossfadeError, CrossfadeResult},
    io::FrameWriter,
    job::{FrameJob, JobEvent},
    naming::OutputPlan,
    source::SourcePair,
};

pub const MIN_FRAMES: u32 = 1;
pub const MAX_FRAMES: u32 = 14;
/// Hard ceiling for `max_frames`: ordinals are two digits and every frame gets its own thread.
pub const FRAME_LIMIT: u32 = 99;

/// One "generate" action: how many intermediate frames and where they go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchRequest {
    pub count: u32,
    pub max_frames: u32,
    pub output: OutputPlan,
}

impl BatchRequest {
    pub fn new(count: u32, output: OutputPlan) -> Self {
        Self {
            count,
            max_frames: MAX_FRAMES,
            output,
        }
    }

    pub fn validate(&self) -> CrossfadeResult<()> {
        if !(MIN_FRAMES..=FRAME_LIMIT).contains(&self.max_frames) {
            return Err(CrossfadeError::validation(format!(
                "max_frames must be in {MIN_FRAMES}..={FRAME_LIMIT} (got {})",
                self.max_frames
            )));
        }
        if !(MIN_FRAMES..=self.max_frames).contains(&self.count) {
            return Err(CrossfadeError::validation(format!(
                "frame count must be in {MIN_FRAMES}..={} (got {})",
                self.max_frames, self.count
            )));
        }
        self.output.validate()
    }
}

/// The running jobs of one request, keyed by output file name.
pub struct Batch {
    jobs: BTreeMap<String, FrameJob>,
}

impl Batch {
    /// Validate, create one job per frame, and start them all.
    ///
    /// Nothing is spawned unless every job could be created. The returned receiver yields the
    /// events of every job in this batch.
    #[tracing::instrument(skip(request, sources, writer), fields(count = request.count))]
    pub fn start(
        request: &BatchRequest,
        sources: &SourcePair,
        writer: Arc<dyn FrameWriter>,
    ) -> CrossfadeResult<(Self, Receiver<JobEvent>)> {
        request.validate()?;
        let (tx, rx) = mpsc::channel();

        let mut jobs = BTreeMap::new();
        for index in 0..request.count {
            let weights = frame_weights(index, request.count)?;
            let job = FrameJob::new(
                request.output.frame_path(index + 1),
                sources.clone(),
                weights,
                writer.clone(),
                tx.clone(),
            )?;
            jobs.insert(job.filename().to_string(), job);
        }
        drop(tx);

        let mut batch = Self { jobs };
        let started = batch.jobs.values_mut().try_for_each(FrameJob::start);
        if let Err(e) = started {
            batch.cancel_and_wait();
            return Err(e);
        }
        tracing::info!(jobs = batch.len(), "batch started");
        Ok((batch, rx))
    }

    /// Cancel every job and block until all worker threads have exited.
    pub fn cancel_and_wait(&mut self) {
        for job in self.jobs.values() {
            job.cancel();
        }
        for job in self.jobs.values_mut() {
            if let Err(e) = job.wait() {
                tracing::warn!(error = %e, "job did not exit cleanly");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.jobs.values().all(FrameJob::is_finished)
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.jobs.keys().map(String::as_str)
    }

    pub fn job(&self, filename: &str) -> Option<&FrameJob> {
        self.jobs.get(filename)
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        self.cancel_and_wait();
    }
}

/// Outcome of a batch as observed through its events.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub saved: Vec<String>,
    pub failed: Vec<String>,
    pub done: usize,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.failed.is_empty()
    }
}

/// Drains a batch's events until every job has reported `Done`.
pub struct BatchMonitor {
    rx: Receiver<JobEvent>,
    expected: usize,
    report: BatchReport,
}

impl BatchMonitor {
    pub fn new(rx: Receiver<JobEvent>, expected: usize) -> Self {
        Self {
            rx,
            expected,
            report: BatchReport::default(),
        }
    }

    /// Block until the batch completes, handing every event to `on_event` first.
    ///
    /// A batch whose jobs stop without saving every frame is reported as cancelled.
    pub fn run(mut self, mut on_event: impl FnMut(&JobEvent)) -> BatchReport {
        while self.report.done < self.expected {
            let Ok(event) = self.rx.recv() else {
                // Every sender is gone; the remaining jobs were dropped before reporting.
                self.report.cancelled = true;
                break;
            };
            on_event(&event);
            self.record(event);
        }
        let finished = self.report.saved.len() + self.report.failed.len();
        if finished < self.expected {
            self.report.cancelled = true;
        }
        tracing::info!(
            saved = self.report.saved.len(),
            failed = self.report.failed.len(),
            cancelled = self.report.cancelled,
            "batch finished"
        );
        self.report
    }

    fn record(&mut self, event: JobEvent) {
        match event {
            JobEvent::Saved { filename, ok: true } => self.report.saved.push(filename),
            JobEvent::Saved {
                filename,
                ok: false,
            } => self.report.failed.push(filename),
            JobEvent::Done { .. } => self.report.done += 1,
            JobEvent::Progress { .. } | JobEvent::Saving { .. } => {}
        }
    }
}

/// Owns at most one active batch, replacing it on every `generate`.
pub struct Crossfader {
    writer: Arc<dyn FrameWriter>,
    active: Option<Batch>,
}

impl Crossfader {
    pub fn new(writer: Arc<dyn FrameWriter>) -> Self {
        Self {
            writer,
            active: None,
        }
    }

    /// Tear down any previous batch (cancel and wait), then start a new one.
    ///
    /// Returns the event receiver and the number of jobs to expect `Done` from.
    pub fn generate(
        &mut self,
        request: &BatchRequest,
        sources: &SourcePair,
    ) -> CrossfadeResult<(Receiver<JobEvent>, usize)> {
        request.validate()?;
        self.cancel();

        let (batch, rx) = Batch::start(request, sources, self.writer.clone())?;
        let len = batch.len();
        self.active = Some(batch);
        Ok((rx, len))
    }

    /// Stop the active batch, if any, and wait for its threads.
    pub fn cancel(&mut self) {
        if let Some(mut batch) = self.active.take() {
            tracing::debug!(jobs = batch.len(), "tearing down active batch");
            batch.cancel_and_wait();
        }
    }

    pub fn is_busy(&self) -> bool {
        self.active.as_ref().is_some_and(|b| !b.is_finished())
    }

    pub fn active(&self) -> Option<&Batch> {
        self.active.as_ref()
    }

    pub fn output_paths(&self) -> Vec<PathBuf> {
        self.active
            .iter()
            .flat_map(|b| b.jobs.values().map(|j| j.path().to_path_buf()))
            .collect()
    }
}

impl Drop for Crossfader {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> OutputPlan {
        OutputPlan::new("target/batch_unit", "Image-", "png").unwrap()
    }

    #[test]
    fn request_bounds() {
        assert!(BatchRequest::new(1, plan()).validate().is_ok());
        assert!(BatchRequest::new(14, plan()).validate().is_ok());
        assert!(BatchRequest::new(0, plan()).validate().is_err());
        assert!(BatchRequest::new(15, plan()).validate().is_err());

        let mut wide = BatchRequest::new(20, plan());
        wide.max_frames = 30;
        assert!(wide.validate().is_ok());

        let mut capped = BatchRequest::new(99, plan());
        capped.max_frames = FRAME_LIMIT;
        assert!(capped.validate().is_ok());

        let mut three_digit = BatchRequest::new(100, plan());
        three_digit.max_frames = 5000;
        let err = three_digit.validate().unwrap_err();
        assert!(err.to_string().contains("max_frames"));
    }

    #[test]
    fn monitor_counts_done_and_outcomes() {
        let (tx, rx) = mpsc::channel();
        for (name, ok) in [("a", true), ("b", false)] {
            tx.send(JobEvent::Saving {
                filename: name.into(),
            })
            .unwrap();
            tx.send(JobEvent::Saved {
                filename: name.into(),
                ok,
            })
            .unwrap();
            tx.send(JobEvent::Done {
                filename: name.into(),
            })
            .unwrap();
        }
        let mut seen = 0;
        let report = BatchMonitor::new(rx, 2).run(|_| seen += 1);
        assert_eq!(seen, 6);
        assert_eq!(report.saved, vec!["a".to_string()]);
        assert_eq!(report.failed, vec!["b".to_string()]);
        assert_eq!(report.done, 2);
        assert!(!report.cancelled);
        assert!(!report.is_success());
    }

    #[test]
    fn monitor_marks_missing_saves_as_cancelled() {
        let (tx, rx) = mpsc::channel();
        tx.send(JobEvent::Done {
            filename: "a".into(),
        })
        .unwrap();
        drop(tx);
        let report = BatchMonitor::new(rx, 2).run(|_| {});
        assert!(report.cancelled);
        assert_eq!(report.done, 1);
    }
}
