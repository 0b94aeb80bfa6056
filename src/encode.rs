//! Streaming GIF encoding.
//!
//! Frames are decoded one at a time at the declared resolution and handed to
//! a NeuQuant-quantized GIF stream. The decoded buffer moves into the encoder,
//! so at most one frame buffer plus the encoder state is held in memory.

use crate::artifact::write_artifact;
use crate::frames::ScaledFrame;
use crate::{CaptureRequest, Error, Result};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame};
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Encoder knobs taken from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    /// Quantizer speed, 1 (best) to 30 (fastest)
    pub quality: u32,
    /// Loop count, 0 loops forever
    pub repeat: u16,
    pub fps: u32,
}

impl EncoderSettings {
    pub fn from_request(request: &CaptureRequest) -> Self {
        Self {
            quality: request.quality,
            repeat: request.repeat,
            fps: request.fps,
        }
    }

    /// Constant per-frame delay of `1000 / fps` milliseconds.
    pub fn delay(&self) -> Delay {
        Delay::from_numer_denom_ms(1000, self.fps.max(1))
    }

    fn repeat(&self) -> Repeat {
        match self.repeat {
            0 => Repeat::Infinite,
            n => Repeat::Finite(n),
        }
    }
}

/// Appends frames of one fixed resolution to a GIF stream.
pub struct AnimationEncoder<W: Write> {
    gif: GifEncoder<W>,
    width: u32,
    height: u32,
    delay: Delay,
    appended: usize,
}

impl<W: Write> AnimationEncoder<W> {
    /// Start a stream of `width` x `height` frames written to `writer`.
    pub fn new(writer: W, width: u32, height: u32, settings: &EncoderSettings) -> Result<Self> {
        if width == 0 || height == 0 || width > u16::MAX as u32 || height > u16::MAX as u32 {
            return Err(Error::EncodeError(format!("Unsupported animation size {}x{}", width, height)));
        }
        if !(1..=30).contains(&settings.quality) {
            return Err(Error::EncodeError(format!("Quality {} outside 1..=30", settings.quality)));
        }

        let mut gif = GifEncoder::new_with_speed(writer, settings.quality as i32);
        gif.set_repeat(settings.repeat())
            .map_err(|e| Error::EncodeError(format!("Failed to set loop count: {}", e)))?;

        Ok(Self {
            gif,
            width,
            height,
            delay: settings.delay(),
            appended: 0,
        })
    }

    /// Number of frames appended so far.
    pub fn len(&self) -> usize {
        self.appended
    }

    pub fn is_empty(&self) -> bool {
        self.appended == 0
    }

    /// Decode `frame`, append it and delete its file.
    ///
    /// Frames must arrive in index order and match the declared resolution
    /// exactly; anything else is an error, never a crop or pad.
    pub fn append(&mut self, frame: ScaledFrame) -> Result<()> {
        if frame.index != self.appended {
            return Err(Error::EncodeError(format!(
                "Frame {} arrived out of order, expected frame {}",
                frame.index, self.appended
            )));
        }

        let img = image::open(&frame.path)
            .map_err(|e| Error::EncodeError(format!("Failed to load frame {}: {}", frame.index, e)))?
            .to_rgba8();

        if img.dimensions() != (self.width, self.height) {
            return Err(Error::EncodeError(format!(
                "Frame {} is {}x{}, encoder expects {}x{}",
                frame.index,
                img.width(),
                img.height(),
                self.width,
                self.height
            )));
        }

        self.gif
            .encode_frame(Frame::from_parts(img, 0, 0, self.delay))
            .map_err(|e| Error::EncodeError(format!("Failed to encode frame {}: {}", frame.index, e)))?;

        frame.discard().map_err(|e| Error::EncodeError(e.to_string()))?;
        self.appended += 1;
        Ok(())
    }

    /// Terminate the stream. Returns the number of frames written.
    pub fn finish(self) -> Result<usize> {
        if self.appended == 0 {
            return Err(Error::EncodeError("No frames captured".into()));
        }
        // the GIF trailer is written when the encoder is dropped
        drop(self.gif);
        Ok(self.appended)
    }
}

/// The encoded animation on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationArtifact {
    pub path: PathBuf,
    pub frame_count: usize,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

/// Encode `frames` into a GIF and write it to `out` in one pass.
pub fn encode_animation(
    frames: Vec<ScaledFrame>,
    width: u32,
    height: u32,
    settings: &EncoderSettings,
    out: &Path,
) -> Result<AnimationArtifact> {
    info!("Encoding {} frames at {}x{}", frames.len(), width, height);
    let total = frames.len();
    let mut buffer = Vec::new();

    let mut encoder = AnimationEncoder::new(&mut buffer, width, height, settings)?;
    for (i, frame) in frames.into_iter().enumerate() {
        encoder.append(frame)?;
        if i % 10 == 0 || i + 1 == total {
            info!("Added frame {}/{} to GIF", i + 1, total);
        }
    }
    let frame_count = encoder.finish()?;

    write_artifact(out, &buffer).map_err(|e| Error::EncodeError(e.to_string()))?;
    info!("GIF size: {:.2} MB", buffer.len() as f64 / (1024.0 * 1024.0));

    Ok(AnimationArtifact {
        path: out.to_path_buf(),
        frame_count,
        width,
        height,
        bytes: buffer.len(),
    })
}
