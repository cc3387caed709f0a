use std::path::{Path, PathBuf};

use crate::{
    error::{CrossfadeError, CrossfadeResult},
    io::is_writable_extension,
};

/// Where and how a batch names its frames: `<dir>/<base><NN>.<ext>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPlan {
    pub dir: PathBuf,
    pub base_name: String,
    pub extension: String,
}

impl OutputPlan {
    pub fn new(
        dir: impl Into<PathBuf>,
        base_name: impl Into<String>,
        extension: impl Into<String>,
    ) -> CrossfadeResult<Self> {
        let plan = Self {
            dir: dir.into(),
            base_name: base_name.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> CrossfadeResult<()> {
        if self.base_name.contains(['/', '\\']) {
            return Err(CrossfadeError::validation(format!(
                "base name '{}' must not contain path separators",
                self.base_name
            )));
        }
        if self.extension.is_empty() {
            return Err(CrossfadeError::validation("output extension must be set"));
        }
        if !is_writable_extension(&self.extension) {
            return Err(CrossfadeError::validation(format!(
                "no image encoder for extension '{}'",
                self.extension
            )));
        }
        Ok(())
    }

    /// File name for the 1-based `ordinal`, zero-padded to two digits.
    pub fn frame_filename(&self, ordinal: u32) -> String {
        format!("{}{:02}.{}", self.base_name, ordinal, self.extension)
    }

    pub fn frame_path(&self, ordinal: u32) -> PathBuf {
        self.dir.join(self.frame_filename(ordinal))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_two_digit_one_based() {
        let plan = OutputPlan::new("out", "Image-", "png").unwrap();
        assert_eq!(plan.frame_filename(1), "Image-01.png");
        assert_eq!(plan.frame_filename(14), "Image-14.png");
        assert_eq!(plan.frame_path(3), PathBuf::from("out").join("Image-03.png"));
    }

    #[test]
    fn leading_dot_in_extension_is_dropped() {
        let plan = OutputPlan::new(".", "f", ".png").unwrap();
        assert_eq!(plan.frame_filename(2), "f02.png");
    }

    #[test]
    fn rejects_separators_and_unknown_extensions() {
        assert!(OutputPlan::new("out", "a/b", "png").is_err());
        assert!(OutputPlan::new("out", "a", "").is_err());
        assert!(OutputPlan::new("out", "a", "xyz").is_err());
        assert!(OutputPlan::new("out", "a", "exr").is_err());
        assert!(OutputPlan::new("out", "a", "hdr").is_err());
    }
}
