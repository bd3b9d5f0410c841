use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use image::{ImageFormat, RgbImage};
use photomerge_core::frame::{CaptureMetadata, Frame};
use photomerge_core::pipeline::config::MergeConfig;
use tracing::debug;

/// Load an image file as an 8-bit RGB frame. Alpha is discarded and
/// 16-bit sources are truncated to 8 bits.
pub fn load_frame(path: &Path, metadata: CaptureMetadata) -> Result<Frame> {
    let img = image::open(path)
        .with_context(|| format!("Failed to load {}", path.display()))?
        .to_rgb8();
    let (w, h) = img.dimensions();
    debug!(path = %path.display(), width = w, height = h, "Loaded image");
    let frame = Frame::from_rgb_bytes(w as usize, h as usize, img.into_raw())?;
    Ok(frame.with_metadata(metadata))
}

/// Load every file in order, pairing each with its entry in the `isos`
/// and `exposures` lists.
pub fn load_frames(files: &[PathBuf], isos: &[u32], exposures: &[u64]) -> Result<Vec<Frame>> {
    let isos = per_input("--iso", isos, files.len())?;
    let exposures = per_input("--exposure-ns", exposures, files.len())?;
    files
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let metadata = CaptureMetadata {
                iso: isos.get(i).copied(),
                exposure_time_ns: exposures.get(i).copied(),
            };
            load_frame(path, metadata)
        })
        .collect()
}

/// Expand a metadata list to one entry per input. An empty list means
/// unknown; a single value applies to every input.
fn per_input<T: Copy>(flag: &str, values: &[T], count: usize) -> Result<Vec<T>> {
    match values.len() {
        0 => Ok(Vec::new()),
        1 => Ok(vec![values[0]; count]),
        n if n == count => Ok(values.to_vec()),
        n => bail!("{flag} takes 1 or {count} values, got {n}"),
    }
}

/// Save a frame, choosing the format from the file extension. Unknown
/// extensions are written as PNG.
pub fn save_frame(frame: Frame, path: &Path) -> Result<()> {
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some("jpg" | "jpeg") => ImageFormat::Jpeg,
        Some("tiff" | "tif") => ImageFormat::Tiff,
        _ => ImageFormat::Png,
    };
    let (w, h) = (frame.width() as u32, frame.height() as u32);
    let img = RgbImage::from_raw(w, h, frame.into_rgb_bytes()).context("Frame buffer does not match its dimensions")?;
    img.save_with_format(path, format)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), ?format, "Saved image");
    Ok(())
}

/// Read a TOML merge config, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<MergeConfig> {
    let Some(path) = path else {
        return Ok(MergeConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&contents).context("Invalid merge config")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: usize, h: usize) -> Frame {
        Frame::from_fn(w, h, |x, y| [(x * 8) as u8, (y * 8) as u8, 128]).unwrap()
    }

    #[test]
    fn test_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let frame = gradient(24, 16);
        save_frame(frame.clone(), &path).unwrap();

        let loaded = load_frame(&path, CaptureMetadata::new(400, 10_000_000)).unwrap();
        assert_eq!(loaded.data, frame.data);
        assert_eq!(loaded.metadata.iso, Some(400));
    }

    #[test]
    fn test_tiff_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tiff");
        let frame = gradient(10, 12);
        save_frame(frame.clone(), &path).unwrap();

        let loaded = load_frame(&path, CaptureMetadata::default()).unwrap();
        assert_eq!(loaded.data, frame.data);
    }

    #[test]
    fn test_jpeg_keeps_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        save_frame(gradient(32, 8), &path).unwrap();

        let loaded = load_frame(&path, CaptureMetadata::default()).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (32, 8));
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_frame(&dir.path().join("nope.png"), CaptureMetadata::default()).unwrap_err();
        assert!(err.to_string().contains("Failed to load"));
    }

    #[test]
    fn test_metadata_lists() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = (0..3).map(|i| dir.path().join(format!("{i}.png"))).collect();
        for path in &files {
            save_frame(gradient(8, 8), path).unwrap();
        }

        let frames = load_frames(&files, &[200], &[1_000, 2_000, 4_000]).unwrap();
        assert!(frames.iter().all(|f| f.metadata.iso == Some(200)));
        let exposures: Vec<_> = frames.iter().map(|f| f.metadata.exposure_time_ns).collect();
        assert_eq!(exposures, vec![Some(1_000), Some(2_000), Some(4_000)]);

        let frames = load_frames(&files, &[], &[]).unwrap();
        assert!(frames.iter().all(|f| f.metadata == CaptureMetadata::default()));

        assert!(load_frames(&files, &[100, 200], &[]).is_err());
    }

    #[test]
    fn test_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merge.toml");
        std::fs::write(&path, "always_alpha = 0.25\n\n[avg]\nspatial_denoise = false\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.always_alpha, 0.25);
        assert!(!config.avg.spatial_denoise);
        assert_eq!(config.hdr.contrast_tiles, MergeConfig::default().hdr.contrast_tiles);

        let default_toml = toml::to_string_pretty(&MergeConfig::default()).unwrap();
        std::fs::write(&path, default_toml).unwrap();
        assert!(load_config(Some(&path)).is_ok());
        assert!(load_config(None).is_ok());
    }
}
