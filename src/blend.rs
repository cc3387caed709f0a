use std::ops::ControlFlow;

use image::{Rgb, RgbImage};

use crate::error::{CrossfadeError, CrossfadeResult};

/// Per-image weights for one blended frame.
///
/// The engine does not require `first + last == 1.0`; [`frame_weights`] always produces pairs
/// that do.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Weights {
    pub first: f64,
    pub last: f64,
}

impl Weights {
    pub fn new(first: f64, last: f64) -> CrossfadeResult<Self> {
        let w = Self { first, last };
        w.validate()?;
        Ok(w)
    }

    pub fn validate(&self) -> CrossfadeResult<()> {
        for (name, v) in [("first", self.first), ("last", self.last)] {
            if !v.is_finite() || v < 0.0 {
                return Err(CrossfadeError::validation(format!(
                    "blend weight '{name}' must be finite and >= 0 (got {v})"
                )));
            }
        }
        Ok(())
    }
}

/// Weights for frame `index` (0-based) of a batch of `count` intermediate frames.
///
/// `first = (index + 1) / (count + 1)`, `last = 1 - first`. The endpoints themselves are never
/// produced, and frame 0 sits closest to the first image.
pub fn frame_weights(index: u32, count: u32) -> CrossfadeResult<Weights> {
    if count == 0 {
        return Err(CrossfadeError::validation("frame count must be >= 1"));
    }
    if index >= count {
        return Err(CrossfadeError::validation(format!(
            "frame index {index} out of range for {count} frames"
        )));
    }
    let first = f64::from(index + 1) / f64::from(count + 1);
    Ok(Weights {
        first,
        last: 1.0 - first,
    })
}

/// Blend two equally sized RGB images pixel by pixel.
///
/// Each channel is `round(first * w.first + last * w.last)` with round-half-away-from-zero,
/// clamped to `0..=255`. Pure and deterministic.
pub fn blend(first: &RgbImage, last: &RgbImage, weights: Weights) -> CrossfadeResult<RgbImage> {
    blend_with_checkpoints(first, last, weights, |_, _| ControlFlow::Continue(()))?.ok_or_else(
        || CrossfadeError::job("blend interrupted without a checkpoint callback (bug)"),
    )
}

/// Same loop as [`blend`], calling `on_line(row, height)` after each completed row.
///
/// Returns `Ok(None)` as soon as the callback breaks; the partial buffer is dropped.
pub fn blend_with_checkpoints(
    first: &RgbImage,
    last: &RgbImage,
    weights: Weights,
    mut on_line: impl FnMut(u32, u32) -> ControlFlow<()>,
) -> CrossfadeResult<Option<RgbImage>> {
    if first.dimensions() != last.dimensions() {
        let (fw, fh) = first.dimensions();
        let (lw, lh) = last.dimensions();
        return Err(CrossfadeError::validation(format!(
            "blend expects equally sized images: got {fw}x{fh} and {lw}x{lh}"
        )));
    }
    weights.validate()?;

    let (width, height) = first.dimensions();
    let mut out = RgbImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let a = first.get_pixel(x, y);
            let b = last.get_pixel(x, y);
            out.put_pixel(x, y, blend_pixel(a, b, weights));
        }
        if on_line(y, height).is_break() {
            return Ok(None);
        }
    }

    Ok(Some(out))
}

fn blend_pixel(a: &Rgb<u8>, b: &Rgb<u8>, w: Weights) -> Rgb<u8> {
    Rgb(std::array::from_fn(|i| blend_channel(a[i], b[i], w)))
}

fn blend_channel(a: u8, b: u8, w: Weights) -> u8 {
    let v = f64::from(a) * w.first + f64::from(b) * w.last;
    v.round().clamp(0.0, 255.0) as u8
}

/// Percentage reached after finishing outer line `line` of `lines`.
///
/// `round(line / (lines / 100))`, capped at 100.
pub fn line_percent(line: u32, lines: u32) -> u8 {
    if lines == 0 {
        return 100;
    }
    let one_percent = f64::from(lines) / 100.0;
    (f64::from(line) / one_percent).round().clamp(0.0, 100.0) as u8
}
