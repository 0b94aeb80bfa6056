//! Scrollcast
//!
//! Turns a web page URL into two visual artifacts: a static "hero" snapshot of
//! the top of the page and an animated GIF of the page being scrolled from top
//! to bottom.
//!
//! # Features
//!
//! - **CDP Backend** (default): drives headless Chrome via the DevTools Protocol
//! - **Synthetic Backend**: a deterministic in-process surface for tests and demos
//! - **Bounded Output**: frame count never exceeds `max_frames`; the scroll step
//!   grows instead
//! - **Bounded Memory**: frames live on disk, are resized in fixed-size batches
//!   and are streamed into the encoder one at a time
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "cdp")]
//! # async fn run() -> scrollcast::Result<()> {
//! use scrollcast::{cdp::CdpLauncher, CaptureRequest, OutputPaths, Pipeline};
//!
//! let request = CaptureRequest {
//!     url: "https://example.com".to_string(),
//!     max_frames: 60,
//!     ..Default::default()
//! };
//!
//! let pipeline = Pipeline::new(CdpLauncher::default(), request)?;
//! let artifacts = pipeline.run(&OutputPaths::in_dir("output")).await?;
//! println!("{:?}", artifacts);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod error;
pub use error::{Error, FailureKind, Result};

pub mod config;
pub use config::CaptureRequest;

#[cfg(feature = "cdp")]
pub mod cdp;

// Deterministic surface used by tests, benches and demos
pub mod synthetic;

// Async facade over a worker-owned surface
pub mod async_api;
pub use async_api::SurfaceHandle;

pub mod artifact;
pub mod capture;
pub mod encode;
pub mod frames;
pub mod hero;
pub mod planner;
pub mod transform;

pub mod pipeline;
pub use pipeline::{AnimationArtifact, Artifacts, HeroArtifact, OutputPaths, Pipeline};

/// Viewport dimensions in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// A rectangular region of the page, in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ClipRegion {
    /// The top `height` pixels of a page `width` pixels wide.
    pub fn top(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// When a navigation counts as settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "until", rename_all = "camelCase")]
pub enum Readiness {
    /// The document load event has fired
    Load,
    /// Load event, then no new network resources for `idle_ms`
    #[serde(rename_all = "camelCase")]
    NetworkIdle { idle_ms: u64 },
}

impl Default for Readiness {
    fn default() -> Self {
        Readiness::NetworkIdle { idle_ms: 500 }
    }
}

/// A controllable rendering surface holding a single page.
///
/// Implementations are driven from exactly one thread at a time (see
/// [`SurfaceHandle`]) and are never asked to run two operations concurrently.
pub trait Surface {
    /// Resize the visible viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Navigate to `url` and block until `readiness` is met or `timeout` elapses
    fn navigate(&mut self, url: &str, readiness: Readiness, timeout: Duration) -> Result<()>;

    /// Evaluate a script in the page context and return its JSON value
    fn evaluate(&mut self, script: &str) -> Result<serde_json::Value>;

    /// Scroll the page vertically to `offset` pixels from the top
    fn scroll_to(&mut self, offset: u32) -> Result<()>;

    /// Capture a PNG of the current viewport, or of `clip` when given
    fn screenshot(&mut self, clip: Option<ClipRegion>) -> Result<Vec<u8>>;

    /// Height in pixels of the full document content
    fn measure_full_height(&mut self) -> Result<u32> {
        let value = self.evaluate(FULL_HEIGHT_SCRIPT)?;
        value
            .as_f64()
            .filter(|h| h.is_finite() && *h >= 0.0)
            .map(|h| h.ceil() as u32)
            .ok_or_else(|| Error::ScriptError(format!("Unexpected page height value: {}", value)))
    }

    /// Release the surface and everything it holds
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Opens surfaces. One launch per pipeline phase.
pub trait Launcher: Send + Sync + 'static {
    type Surface: Surface;

    fn launch(&self, viewport: Viewport) -> Result<Self::Surface>;
}

/// Script returning the full content height of the current document.
pub const FULL_HEIGHT_SCRIPT: &str = r#"
(function() {
    return Math.max(
        document.body ? document.body.scrollHeight : 0,
        document.documentElement.scrollHeight,
        document.body ? document.body.offsetHeight : 0,
        document.documentElement.offsetHeight
    );
})()
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_viewport() {
        let viewport = Viewport::default();
        assert_eq!(viewport.width, 1920);
        assert_eq!(viewport.height, 1080);
    }

    #[test]
    fn test_readiness_serde() {
        let r: Readiness = serde_json::from_str(r#"{"until":"networkIdle","idleMs":250}"#).unwrap();
        assert_eq!(r, Readiness::NetworkIdle { idle_ms: 250 });
        let r: Readiness = serde_json::from_str(r#"{"until":"load"}"#).unwrap();
        assert_eq!(r, Readiness::Load);
    }

    #[test]
    fn test_clip_top() {
        let clip = ClipRegion::top(1920, 800);
        assert_eq!((clip.x, clip.y, clip.width, clip.height), (0, 0, 1920, 800));
    }
}
