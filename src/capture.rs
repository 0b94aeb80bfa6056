//! Frame capture: drive one surface through navigate, measure and a
//! sequential scroll/settle/screenshot loop.

use crate::frames::{FrameStore, RawFrame};
use crate::planner::{plan_frames, FramePlan, PageGeometry};
use crate::{CaptureRequest, Error, Result, SurfaceHandle};
use log::{debug, info};
use std::time::Duration;

/// Where the capturer is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    NotStarted,
    Navigating,
    Measuring,
    Capturing { index: u32, of: u32 },
    Done,
    Failed,
}

/// Frames captured by one run, in ascending scroll-offset order.
#[derive(Debug)]
pub struct Capture {
    pub geometry: PageGeometry,
    pub plan: FramePlan,
    pub frames: Vec<RawFrame>,
}

/// Captures a scrolling page into raw frames.
///
/// Capture is strictly sequential; a surface cannot scroll and screenshot
/// for two frames at once.
pub struct FrameCapturer<'a> {
    surface: &'a SurfaceHandle,
    request: &'a CaptureRequest,
    state: CaptureState,
}

impl<'a> FrameCapturer<'a> {
    pub fn new(surface: &'a SurfaceHandle, request: &'a CaptureRequest) -> Self {
        Self {
            surface,
            request,
            state: CaptureState::NotStarted,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    fn enter(&mut self, state: CaptureState) {
        debug!("Capture state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Run the whole capture, writing raw frames into `store`.
    ///
    /// Any failure aborts the run; frames written so far stay in `store`
    /// for it to clean up.
    pub async fn run(&mut self, store: &FrameStore) -> Result<Capture> {
        let result = self.run_inner(store).await;
        match &result {
            Ok(_) => self.enter(CaptureState::Done),
            Err(_) => self.enter(CaptureState::Failed),
        }
        result
    }

    async fn run_inner(&mut self, store: &FrameStore) -> Result<Capture> {
        let request = self.request;

        self.enter(CaptureState::Navigating);
        info!("Navigating to {}...", request.url);
        self.surface.set_viewport(request.viewport).await?;
        self.surface
            .navigate(&request.url, request.readiness, request.navigation_timeout())
            .await
            .map_err(Error::unreachable)?;
        settle(request.navigation_settle()).await;

        self.enter(CaptureState::Measuring);
        let geometry = PageGeometry {
            full_content_height: self.surface.measure_full_height().await?,
            viewport_height: request.viewport.height,
        };
        info!("Full page height: {}px", geometry.full_content_height);

        let plan = plan_frames(geometry.scrollable_distance(), request.scroll_step, request.max_frames);
        if plan.is_single() {
            info!("Page is too short for scrolling; taking a single screenshot instead");
        }

        let mut frames = Vec::with_capacity(plan.frame_count as usize);
        for (index, offset) in plan.offsets().enumerate() {
            self.enter(CaptureState::Capturing {
                index: index as u32,
                of: plan.frame_count,
            });

            if !plan.is_single() {
                self.surface
                    .scroll_to(offset)
                    .await
                    .map_err(|e| Error::capture(index, e))?;
                settle(request.scroll_settle()).await;
            }

            let png = self
                .surface
                .screenshot(None)
                .await
                .map_err(|e| Error::capture(index, e))?;
            frames.push(store.write_raw(index, &png).map_err(|e| Error::capture(index, e))?);

            if index % 10 == 0 || index + 1 == plan.frame_count as usize {
                info!(
                    "Captured frame {}/{} (Position: {}/{})",
                    index + 1,
                    plan.frame_count,
                    offset,
                    geometry.scrollable_distance()
                );
            }
        }

        Ok(Capture { geometry, plan, frames })
    }
}

async fn settle(wait: Duration) {
    if !wait.is_zero() {
        tokio::time::sleep(wait).await;
    }
}
