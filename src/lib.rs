//! Cross-fade frame generation.
//!
//! Two source images are resized to a common size once per batch ([`SourcePair`]); each
//! requested frame is then blended on its own thread by a [`FrameJob`] that reports progress
//! over a channel and can be cancelled cooperatively.
#![forbid(unsafe_code)]

mod foundation;

pub mod batch;
pub mod blend;
pub mod config;
pub mod io;
pub mod job;
pub mod naming;
pub mod source;

pub use foundation::error;

pub use batch::{
    Batch, BatchMonitor, BatchReport, BatchRequest, Crossfader, FRAME_LIMIT, MAX_FRAMES,
    MIN_FRAMES,
};
pub use blend::{Weights, blend, blend_with_checkpoints, frame_weights, line_percent};
pub use config::CrossfadeConfig;
pub use error::{CrossfadeError, CrossfadeResult};
pub use io::{
    FrameWriter, ImageFileWriter, filename_filter, load_image, supported_extensions,
};
pub use job::{CancelToken, FrameJob, JobEvent};
pub use naming::OutputPlan;
pub use source::{ResizeFilter, SourcePair, common_size};
