//! Frame transformation: downscale raw frames to the animation resolution.
//!
//! Frames are processed in fixed-size batches. Frames inside a batch are
//! resized concurrently on the blocking pool; the next batch starts only once
//! every frame of the current one has finished, which caps open files and
//! decoded images at one batch worth. Each raw frame is deleted as soon as its
//! scaled counterpart is on disk.

use crate::frames::{FrameStore, RawFrame, ScaledFrame};
use crate::{CaptureRequest, Error, Result};
use futures::future::join_all;
use image::imageops::FilterType;
use image::ImageFormat;
use log::info;
use std::path::PathBuf;

/// Batched, parallel-within-a-batch frame resizer.
#[derive(Debug, Clone, Copy)]
pub struct FrameTransformer {
    pub width: u32,
    pub height: u32,
    pub batch_size: usize,
    pub filter: FilterType,
}

impl FrameTransformer {
    pub fn new(width: u32, height: u32, batch_size: usize) -> Self {
        Self {
            width,
            height,
            batch_size: batch_size.max(1),
            filter: FilterType::Lanczos3,
        }
    }

    pub fn from_request(request: &CaptureRequest) -> Self {
        let (width, height) = request.scaled_size();
        Self::new(width, height, request.batch_size)
    }

    /// Scale every frame, preserving order.
    ///
    /// The first failing batch aborts the run. Frames from it and from
    /// batches never started stay in `store`.
    pub async fn transform(&self, store: &FrameStore, frames: Vec<RawFrame>) -> Result<Vec<ScaledFrame>> {
        let total = frames.len();
        let batches = total.div_ceil(self.batch_size);
        let mut scaled = Vec::with_capacity(total);
        let mut pending = frames.into_iter().peekable();
        let mut batch_no = 0;

        while pending.peek().is_some() {
            let batch: Vec<RawFrame> = pending.by_ref().take(self.batch_size).collect();
            batch_no += 1;

            let tasks = batch.into_iter().map(|raw| {
                let target = store.scaled_path(raw.index);
                let job = *self;
                tokio::task::spawn_blocking(move || job.scale_frame(raw, target))
            });

            // wait for the whole batch before looking at any result
            let results = join_all(tasks).await;
            let mut failure = None;
            for result in results {
                match result {
                    Ok(Ok(frame)) => scaled.push(frame),
                    Ok(Err(e)) => {
                        failure.get_or_insert(e);
                    }
                    Err(join_err) => {
                        failure.get_or_insert(Error::TransformError(format!("Resize task failed: {}", join_err)));
                    }
                }
            }
            if let Some(e) = failure {
                return Err(e);
            }

            info!("Processed batch {}/{}", batch_no, batches);
        }

        Ok(scaled)
    }

    fn scale_frame(&self, raw: RawFrame, target: PathBuf) -> Result<ScaledFrame> {
        let img = image::open(&raw.path)
            .map_err(|e| Error::TransformError(format!("Failed to decode frame {}: {}", raw.index, e)))?;

        img.resize_exact(self.width, self.height, self.filter)
            .to_rgba8()
            .save_with_format(&target, ImageFormat::Png)
            .map_err(|e| Error::TransformError(format!("Failed to write scaled frame {}: {}", raw.index, e)))?;

        let index = raw.index;
        raw.discard()
            .map_err(|e| Error::TransformError(e.to_string()))?;
        Ok(ScaledFrame { index, path: target })
    }
}
