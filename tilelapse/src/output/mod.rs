//! Sequence output
//!
//! Accumulates the per-version mosaics the crawler emits and hands them to
//! the image codecs: one JPEG still per retained version and/or one looping
//! GIF animation running from the oldest retained version to the newest.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::codecs::gif::{GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::{Delay, DynamicImage, Frame, RgbImage};
use thiserror::Error;
use tracing::info;

use crate::mosaic::MosaicImage;

/// Errors from encoding or writing output artifacts.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write output file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Which artifacts a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Stills,
    Animation,
    Both,
}

impl OutputFormat {
    fn stills(&self) -> bool {
        matches!(self, OutputFormat::Stills | OutputFormat::Both)
    }

    fn animation(&self) -> bool {
        matches!(self, OutputFormat::Animation | OutputFormat::Both)
    }
}

/// Consumer of the mosaics the crawler emits, newest version first.
pub trait MosaicSink {
    fn emit(&mut self, mosaic: &MosaicImage) -> Result<(), OutputError>;
}

/// Configuration for a `SequenceRecorder`.
#[derive(Debug, Clone)]
pub struct SequenceConfig {
    pub format: OutputFormat,
    /// Directory the artifacts are written into.
    pub directory: PathBuf,
    /// Base of every artifact file name.
    pub basename: String,
    /// JPEG quality for stills, 1-100.
    pub jpeg_quality: u8,
    /// Display duration of each animation frame.
    pub frame_interval: Duration,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Both,
            directory: PathBuf::from("."),
            basename: "timelapse".to_string(),
            jpeg_quality: 90,
            frame_interval: Duration::from_millis(200),
        }
    }
}

/// Writes stills as they arrive and retains frames for the final animation.
pub struct SequenceRecorder {
    config: SequenceConfig,
    /// Retained animation frames in emission order (newest version first).
    frames: Vec<(u32, RgbImage)>,
    written: Vec<PathBuf>,
}

impl SequenceRecorder {
    pub fn new(config: SequenceConfig) -> Self {
        Self {
            config,
            frames: Vec::new(),
            written: Vec::new(),
        }
    }

    fn still_path(&self, version: u32) -> PathBuf {
        self.config
            .directory
            .join(format!("{}-v{}.jpg", self.config.basename, version))
    }

    fn animation_path(&self) -> PathBuf {
        self.config
            .directory
            .join(format!("{}.gif", self.config.basename))
    }

    fn write_still(&self, mosaic: &MosaicImage, path: &Path) -> Result<(), OutputError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let encoder = JpegEncoder::new_with_quality(&mut writer, self.config.jpeg_quality);
        mosaic.raster().write_with_encoder(encoder)?;
        Ok(())
    }

    /// Finishes the sequence: assembles retained frames, oldest version
    /// first, into a looping GIF. Returns the paths of all written
    /// artifacts. A run that retained nothing writes nothing.
    pub fn finalize(mut self) -> Result<Vec<PathBuf>, OutputError> {
        if self.config.format.animation() && !self.frames.is_empty() {
            let path = self.animation_path();
            let file = File::create(&path)?;
            let mut encoder = GifEncoder::new(BufWriter::new(file));
            encoder.set_repeat(Repeat::Infinite)?;

            // Emission order is newest-first; the animation plays forward
            // through history.
            self.frames.reverse();
            let delay = Delay::from_saturating_duration(self.config.frame_interval);
            for (_, raster) in self.frames {
                let rgba = DynamicImage::ImageRgb8(raster).to_rgba8();
                encoder.encode_frame(Frame::from_parts(rgba, 0, 0, delay))?;
            }
            info!(path = %path.display(), "wrote animation");
            self.written.push(path);
        }
        Ok(self.written)
    }
}

impl MosaicSink for SequenceRecorder {
    fn emit(&mut self, mosaic: &MosaicImage) -> Result<(), OutputError> {
        if self.config.format.stills() {
            let path = self.still_path(mosaic.version());
            self.write_still(mosaic, &path)?;
            info!(version = mosaic.version(), path = %path.display(), "wrote still");
            self.written.push(path);
        }
        if self.config.format.animation() {
            self.frames.push((mosaic.version(), mosaic.raster().clone()));
        }
        Ok(())
    }
}
