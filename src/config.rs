use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::{
    batch::{BatchRequest, FRAME_LIMIT, MAX_FRAMES, MIN_FRAMES},
    error::{CrossfadeError, CrossfadeResult},
    naming::OutputPlan,
    source::ResizeFilter,
};

/// Settings for one generate run, loadable from JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrossfadeConfig {
    pub first: Option<PathBuf>,
    pub last: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub base_name: String,
    pub count: u32,
    pub extension: String,
    pub filter: ResizeFilter,
    pub max_frames: u32,
}

impl Default for CrossfadeConfig {
    fn default() -> Self {
        Self {
            first: None,
            last: None,
            out_dir: PathBuf::from("."),
            base_name: "Image-".to_string(),
            count: 5,
            extension: "png".to_string(),
            filter: ResizeFilter::default(),
            max_frames: MAX_FRAMES,
        }
    }
}

impl CrossfadeConfig {
    pub fn from_json_path(path: &Path) -> CrossfadeResult<Self> {
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| CrossfadeError::validation(format!("config '{}': {e}", path.display())))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> CrossfadeResult<()> {
        if self.first.is_none() || self.last.is_none() {
            return Err(CrossfadeError::validation(
                "both a first and a last image are required",
            ));
        }
        if !(MIN_FRAMES..=FRAME_LIMIT).contains(&self.max_frames) {
            return Err(CrossfadeError::validation(format!(
                "max_frames must be in {MIN_FRAMES}..={FRAME_LIMIT} (got {})",
                self.max_frames
            )));
        }
        self.batch_request()?.validate()
    }

    pub fn output_plan(&self) -> CrossfadeResult<OutputPlan> {
        OutputPlan::new(&self.out_dir, &self.base_name, &self.extension)
    }

    pub fn batch_request(&self) -> CrossfadeResult<BatchRequest> {
        let mut req = BatchRequest::new(self.count, self.output_plan()?);
        req.max_frames = self.max_frames;
        Ok(req)
    }
}
