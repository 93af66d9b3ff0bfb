use crate::interface::{Frame, TimedFrame, TransportError};
use crate::telemetry::LogManager;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame as GifFrame, ImageFormat, RgbImage};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),
    #[error("clip has no frames")]
    EmptyClip,
    #[error("{0} was written empty")]
    EmptyFile(PathBuf),
    #[error("frame cannot be encoded: {0}")]
    InvalidFrame(String),
    #[error("encoding task aborted: {0}")]
    Aborted(String),
}

pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// What ended up in an encoded clip.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSummary {
    pub path: PathBuf,
    pub frames: usize,
    pub bytes: u64,
    /// Every frame carried identical pixels.
    pub static_content: bool,
}

fn to_image(frame: &Frame) -> DeliveryResult<RgbImage> {
    RgbImage::from_raw(
        frame.width() as u32,
        frame.height() as u32,
        frame.to_rgb_bytes(),
    )
    .ok_or_else(|| {
        DeliveryError::InvalidFrame(format!("{}x{} buffer mismatch", frame.width(), frame.height()))
    })
}

/// Size of a freshly written file; zero bytes counts as a failure.
pub fn verify_file(path: &Path) -> DeliveryResult<u64> {
    let bytes = fs::metadata(path)?.len();
    if bytes == 0 {
        return Err(DeliveryError::EmptyFile(path.to_path_buf()));
    }
    Ok(bytes)
}

fn ensure_parent(path: &Path) -> DeliveryResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Writes the trigger frame as a JPEG snapshot.
pub fn write_snapshot(frame: &Frame, path: &Path) -> DeliveryResult<u64> {
    ensure_parent(path)?;
    to_image(frame)?.save_with_format(path, ImageFormat::Jpeg)?;
    verify_file(path)
}

/// Encodes frames, in order, as a looping animated GIF at `fps`.
pub fn write_clip(frames: &[TimedFrame], fps: f64, path: &Path) -> DeliveryResult<ClipSummary> {
    let logger = LogManager::new("media");
    let first = frames.first().ok_or(DeliveryError::EmptyClip)?;
    let (width, height) = (first.frame.width(), first.frame.height());

    for pair in frames.windows(2) {
        if pair[1].captured_at < pair[0].captured_at {
            logger.warn(&format!(
                "clip timestamps regress ({:.3}s after {:.3}s)",
                pair[1].captured_at, pair[0].captured_at
            ));
            break;
        }
    }

    ensure_parent(path)?;
    let delay = Delay::from_saturating_duration(Duration::from_secs_f64(1.0 / fps.max(1e-3)));
    let mut writer = BufWriter::new(File::create(path)?);
    let mut written = 0;
    {
        let mut encoder = GifEncoder::new_with_speed(&mut writer, 10);
        encoder.set_repeat(Repeat::Infinite)?;
        for timed in frames {
            if timed.frame.width() != width || timed.frame.height() != height {
                logger.warn(&format!(
                    "skipping {}x{} frame in {}x{} clip",
                    timed.frame.width(),
                    timed.frame.height(),
                    width,
                    height
                ));
                continue;
            }
            let rgba = DynamicImage::ImageRgb8(to_image(&timed.frame)?).into_rgba8();
            encoder.encode_frame(GifFrame::from_parts(rgba, 0, 0, delay))?;
            written += 1;
        }
    }
    writer.flush()?;
    drop(writer);

    let static_content = frames
        .windows(2)
        .all(|pair| pair[0].frame == pair[1].frame);
    if static_content && frames.len() > 1 {
        logger.warn(&format!(
            "clip {} shows no motion across {} frames",
            path.display(),
            frames.len()
        ));
    }

    let bytes = verify_file(path)?;
    logger.detail(&format!(
        "wrote {} ({} frames, {} bytes)",
        path.display(),
        written,
        bytes
    ));
    Ok(ClipSummary {
        path: path.to_path_buf(),
        frames: written,
        bytes,
        static_content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn timed(at: f64, shade: u8) -> TimedFrame {
        TimedFrame::new(at, Arc::new(Frame::filled(8, 6, [shade, 0, 0])))
    }

    #[test]
    fn snapshot_is_a_readable_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shots/alert.jpg");
        let bytes = write_snapshot(&Frame::filled(16, 16, [0, 90, 200]), &path).unwrap();
        assert!(bytes > 0);
        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.width(), 16);
    }

    #[test]
    fn clip_encodes_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.gif");
        let frames = vec![timed(0.0, 10), timed(0.5, 60), timed(1.0, 120)];
        let summary = write_clip(&frames, 2.0, &path).unwrap();
        assert_eq!(summary.frames, 3);
        assert!(!summary.static_content);
        assert!(summary.bytes > 0);
    }

    #[test]
    fn identical_frames_are_flagged_static() {
        let dir = tempfile::tempdir().unwrap();
        let frames = vec![timed(0.0, 5), timed(1.0, 5)];
        let summary = write_clip(&frames, 1.0, &dir.path().join("still.gif")).unwrap();
        assert!(summary.static_content);
    }

    #[test]
    fn empty_clip_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            write_clip(&[], 30.0, &dir.path().join("none.gif")),
            Err(DeliveryError::EmptyClip)
        ));
    }

    #[test]
    fn zero_byte_file_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.gif");
        File::create(&path).unwrap();
        assert!(matches!(verify_file(&path), Err(DeliveryError::EmptyFile(_))));
    }
}
