use std::path::Path;

use anyhow::Context as _;
use image::{DynamicImage, ImageFormat, RgbImage};

use crate::error::{CrossfadeError, CrossfadeResult};

/// Decode an image file from disk.
pub fn load_image(path: &Path) -> CrossfadeResult<DynamicImage> {
    image::ImageReader::open(path)
        .with_context(|| format!("open image '{}'", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("sniff image format '{}'", path.display()))?
        .decode()
        .map_err(|e| CrossfadeError::decode(format!("'{}': {e}", path.display())))
}

/// Persists one finished frame.
///
/// Called from worker threads, so implementations must be shareable.
pub trait FrameWriter: Send + Sync {
    fn write(&self, image: &RgbImage, path: &Path) -> CrossfadeResult<()>;
}

/// Writes frames with the encoder implied by the file extension.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageFileWriter;

impl FrameWriter for ImageFileWriter {
    fn write(&self, image: &RgbImage, path: &Path) -> CrossfadeResult<()> {
        let format = ImageFormat::from_path(path).map_err(|e| {
            CrossfadeError::encode(format!("no encoder for '{}': {e}", path.display()))
        })?;
        ensure_parent_dir(path)?;
        image
            .save_with_format(path, format)
            .map_err(|e| CrossfadeError::encode(format!("write '{}': {e}", path.display())))
    }
}

pub fn ensure_parent_dir(path: &Path) -> CrossfadeResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// File extensions the `image` crate can decode and can encode RGB8 frames to, sorted and
/// deduplicated.
pub fn supported_extensions() -> Vec<&'static str> {
    let mut out: Vec<&'static str> = ImageFormat::all()
        .filter(|f| f.reading_enabled() && encodes_rgb8(*f))
        .flat_map(|f| f.extensions_str().iter().copied())
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Whether `ext` (without the dot) names a format that can encode RGB8 frames.
pub fn is_writable_extension(ext: &str) -> bool {
    ImageFormat::from_extension(ext).is_some_and(encodes_rgb8)
}

// OpenEXR and Radiance HDR only take float pixels; farbfeld only takes RGBA16.
fn encodes_rgb8(format: ImageFormat) -> bool {
    format.writing_enabled()
        && !matches!(
            format,
            ImageFormat::OpenExr | ImageFormat::Hdr | ImageFormat::Farbfeld
        )
}

/// File-dialog style filter, e.g. `Images (*.jpg *.png *)`.
pub fn filename_filter(name: &str, extensions: &[&str]) -> String {
    let mut patterns: Vec<String> = extensions.iter().map(|e| format!("*.{e}")).collect();
    if !patterns.is_empty() {
        patterns.push("*".to_string());
    }
    format!("{name} ({})", patterns.join(" "))
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn filter_string_matches_dialog_shape() {
        assert_eq!(
            filename_filter("Images", &["jpg", "png"]),
            "Images (*.jpg *.png *)"
        );
        assert_eq!(filename_filter("Images", &[]), "Images ()");
    }

    #[test]
    fn png_is_supported_and_writable() {
        assert!(supported_extensions().contains(&"png"));
        assert!(is_writable_extension("png"));
        assert!(is_writable_extension("PNG"));
        assert!(!is_writable_extension("notaformat"));
    }

    #[test]
    fn formats_without_rgb8_encoding_are_excluded() {
        let listed = supported_extensions();
        for ext in ["exr", "hdr", "ff"] {
            assert!(!is_writable_extension(ext), "{ext} accepted");
            assert!(!listed.contains(&ext), "{ext} listed");
        }
    }

    #[test]
    fn every_listed_extension_encodes_rgb8() {
        let dir = std::path::PathBuf::from("target").join("io_unit").join("formats");
        let img = RgbImage::from_pixel(2, 2, Rgb([10, 200, 30]));
        for ext in supported_extensions() {
            let path = dir.join(format!("frame.{ext}"));
            ImageFileWriter
                .write(&img, &path)
                .unwrap_or_else(|e| panic!("{ext}: {e}"));
        }
    }

    #[test]
    fn png_write_then_load_is_lossless() {
        let dir = std::path::PathBuf::from("target").join("io_unit");
        let path = dir.join("roundtrip.png");
        let _ = std::fs::remove_file(&path);

        let mut img = RgbImage::new(3, 2);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Rgb([x as u8 * 40, y as u8 * 90, 7]);
        }
        ImageFileWriter.write(&img, &path).unwrap();

        let back = load_image(&path).unwrap().to_rgb8();
        assert_eq!(back, img);
    }

    #[test]
    fn unknown_extension_is_encode_error() {
        let path = std::path::PathBuf::from("target")
            .join("io_unit")
            .join("frame.unknownext");
        let err = ImageFileWriter
            .write(&RgbImage::new(1, 1), &path)
            .unwrap_err();
        assert!(matches!(err, CrossfadeError::Encode(_)));
        assert!(!path.exists());
    }

    #[test]
    fn load_missing_file_errors() {
        assert!(load_image(Path::new("target/io_unit/does-not-exist.png")).is_err());
    }
}
