use std::sync::Arc;

use image::{DynamicImage, GenericImageView, RgbImage, imageops::FilterType};

use crate::error::{CrossfadeError, CrossfadeResult};

/// Resampling filter used when bringing both sources to their common size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    Nearest,
    /// Bilinear.
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResizeFilter {
    pub fn filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Smaller width and smaller height of the two inputs.
pub fn common_size(a: (u32, u32), b: (u32, u32)) -> (u32, u32) {
    (a.0.min(b.0), a.1.min(b.1))
}

/// The two blend inputs, already converted to RGB8 and resized to a common size.
///
/// Shared read-only by every job of a batch.
#[derive(Clone, Debug)]
pub struct SourcePair {
    first: Arc<RgbImage>,
    last: Arc<RgbImage>,
}

impl SourcePair {
    /// Stretch both images independently (aspect ratio is not preserved) to their bounded size.
    #[tracing::instrument(skip(first, last))]
    pub fn prepare(
        first: &DynamicImage,
        last: &DynamicImage,
        filter: ResizeFilter,
    ) -> CrossfadeResult<Self> {
        ensure_non_empty("first", first.width(), first.height())?;
        ensure_non_empty("last", last.width(), last.height())?;

        let (width, height) = common_size(first.dimensions(), last.dimensions());
        ensure_non_empty("common", width, height)?;

        tracing::debug!(width, height, "resizing sources to common size");
        Ok(Self {
            first: Arc::new(resize_rgb(first, width, height, filter)),
            last: Arc::new(resize_rgb(last, width, height, filter)),
        })
    }

    /// Wrap two RGB images that already share a size; no resampling happens.
    pub fn from_rgb(first: RgbImage, last: RgbImage) -> CrossfadeResult<Self> {
        ensure_non_empty("first", first.width(), first.height())?;
        if first.dimensions() != last.dimensions() {
            return Err(CrossfadeError::validation(format!(
                "source images differ in size: {:?} vs {:?}",
                first.dimensions(),
                last.dimensions()
            )));
        }
        Ok(Self {
            first: Arc::new(first),
            last: Arc::new(last),
        })
    }

    pub fn first(&self) -> &RgbImage {
        &self.first
    }

    pub fn last(&self) -> &RgbImage {
        &self.last
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.first.dimensions()
    }
}

fn ensure_non_empty(which: &str, width: u32, height: u32) -> CrossfadeResult<()> {
    if width == 0 || height == 0 {
        return Err(CrossfadeError::validation(format!(
            "{which} image size must be non-zero (got {width}x{height})"
        )));
    }
    Ok(())
}

fn resize_rgb(img: &DynamicImage, width: u32, height: u32, filter: ResizeFilter) -> RgbImage {
    let rgb = img.to_rgb8();
    if rgb.dimensions() == (width, height) {
        return rgb;
    }
    image::imageops::resize(&rgb, width, height, filter.filter_type())
}
