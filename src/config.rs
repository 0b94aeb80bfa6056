//! Capture request: the option surface consumed by the pipeline
//!
//! Option names follow the JSON surface (`heroHeight`, `scrollStep`,
//! `maxFrames`, `scaleFactor`, ...). Every option has a default so a request
//! can be built from nothing but a URL.

use crate::{Error, Readiness, Result, Viewport};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Largest GIF logical screen dimension.
const GIF_MAX_DIMENSION: u32 = u16::MAX as u32;

/// Everything one pipeline run needs. Immutable for the duration of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureRequest {
    /// Page to capture
    pub url: String,
    /// Viewport used for both the hero shot and the scroll capture
    #[serde(flatten)]
    pub viewport: Viewport,
    /// Height of the hero clip, starting at the top of the page
    pub hero_height: u32,
    /// Target animation frame rate
    pub fps: u32,
    /// Requested scroll increment between frames, in pixels
    pub scroll_step: u32,
    /// Encoder quality/speed trade-off: 1 is best, 30 is fastest
    pub quality: u32,
    /// Hard upper bound on the number of animation frames
    pub max_frames: u32,
    /// Downscale applied to every animation frame, in (0, 1]
    pub scale_factor: f64,
    /// Loop count for the animation, 0 loops forever
    pub repeat: u16,
    /// Run the hero phase
    pub capture_hero: bool,
    /// Run the scrolling animation phase
    pub capture_animation: bool,
    /// When a navigation is considered settled
    pub readiness: Readiness,
    pub navigation_timeout_ms: u64,
    /// Fixed wait after navigation settles, before anything is captured
    pub navigation_settle_ms: u64,
    /// Fixed wait after each scroll, before the screenshot
    pub scroll_settle_ms: u64,
    /// Number of frames resized concurrently
    pub batch_size: usize,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            url: String::new(),
            viewport: Viewport::default(),
            hero_height: 800,
            fps: 15,
            scroll_step: 10,
            quality: 10,
            max_frames: 120,
            scale_factor: 0.5,
            repeat: 0,
            capture_hero: true,
            capture_animation: true,
            readiness: Readiness::default(),
            navigation_timeout_ms: 60_000,
            navigation_settle_ms: 2_000,
            scroll_settle_ms: 200,
            batch_size: 10,
        }
    }
}

impl CaptureRequest {
    /// Request for `url` with every other option at its default.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Parse a JSON options document. Missing options take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::ConfigError(format!("Malformed options: {}", e)))
    }

    /// Load a JSON options file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read options file {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Check every invariant the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| Error::ConfigError(format!("Invalid URL '{}': {}", self.url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::ConfigError(format!(
                "Unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }

        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError("viewport width and height must be non-zero".into()));
        }
        if !(self.scale_factor > 0.0 && self.scale_factor <= 1.0) {
            return Err(Error::ConfigError(format!(
                "scaleFactor must be in (0, 1], got {}",
                self.scale_factor
            )));
        }
        if self.max_frames == 0 {
            return Err(Error::ConfigError("maxFrames must be at least 1".into()));
        }
        if self.scroll_step == 0 {
            return Err(Error::ConfigError("scrollStep must be non-zero".into()));
        }
        if self.fps == 0 {
            return Err(Error::ConfigError("fps must be non-zero".into()));
        }
        if !(1..=30).contains(&self.quality) {
            return Err(Error::ConfigError(format!(
                "quality must be between 1 and 30, got {}",
                self.quality
            )));
        }
        if self.hero_height == 0 {
            return Err(Error::ConfigError("heroHeight must be non-zero".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::ConfigError("batchSize must be at least 1".into()));
        }

        let (w, h) = self.scaled_size();
        if w == 0 || h == 0 {
            return Err(Error::ConfigError(format!(
                "scaled frame size {}x{} is empty; raise scaleFactor",
                w, h
            )));
        }
        if w > GIF_MAX_DIMENSION || h > GIF_MAX_DIMENSION {
            return Err(Error::ConfigError(format!(
                "scaled frame size {}x{} exceeds the GIF limit of {}",
                w, h, GIF_MAX_DIMENSION
            )));
        }
        Ok(())
    }

    /// Animation frame resolution: viewport times scale factor, rounded down.
    pub fn scaled_size(&self) -> (u32, u32) {
        let scale = |v: u32| (v as f64 * self.scale_factor).floor() as u32;
        (scale(self.viewport.width), scale(self.viewport.height))
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn navigation_settle(&self) -> Duration {
        Duration::from_millis(self.navigation_settle_ms)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_settings() {
        let req = CaptureRequest::for_url("https://example.com");
        assert_eq!(req.viewport, Viewport { width: 1920, height: 1080 });
        assert_eq!(req.hero_height, 800);
        assert_eq!(req.fps, 15);
        assert_eq!(req.scroll_step, 10);
        assert_eq!(req.quality, 10);
        assert_eq!(req.max_frames, 120);
        assert_eq!(req.scale_factor, 0.5);
        assert_eq!(req.repeat, 0);
        assert_eq!(req.batch_size, 10);
        assert!(req.validate().is_ok());
        assert_eq!(req.scaled_size(), (960, 540));
    }

    #[test]
    fn json_options_use_camel_case_names() {
        let req = CaptureRequest::from_json(
            r#"{"url":"https://example.com","width":800,"height":600,"heroHeight":300,
                "scrollStep":25,"maxFrames":40,"scaleFactor":0.25,"fps":10,"quality":20}"#,
        )
        .unwrap();
        assert_eq!(req.viewport, Viewport { width: 800, height: 600 });
        assert_eq!(req.hero_height, 300);
        assert_eq!(req.scroll_step, 25);
        assert_eq!(req.max_frames, 40);
        assert_eq!(req.quality, 20);
        assert_eq!(req.scaled_size(), (200, 150));
        // untouched options keep their defaults
        assert_eq!(req.navigation_timeout_ms, 60_000);
        assert!(req.capture_hero);
    }

    #[test]
    fn width_alone_keeps_default_height() {
        let req = CaptureRequest::from_json(r#"{"url":"https://example.com","width":1280}"#).unwrap();
        assert_eq!(req.viewport, Viewport { width: 1280, height: 1080 });
    }

    #[test]
    fn scaled_size_floors() {
        let req = CaptureRequest {
            viewport: Viewport { width: 1001, height: 333 },
            scale_factor: 0.5,
            ..CaptureRequest::for_url("https://example.com")
        };
        assert_eq!(req.scaled_size(), (500, 166));
    }

    #[test]
    fn validation_rejects_broken_requests() {
        let base = CaptureRequest::for_url("https://example.com");
        let cases = vec![
            CaptureRequest { url: "not a url".into(), ..base.clone() },
            CaptureRequest { url: "ftp://example.com".into(), ..base.clone() },
            CaptureRequest { viewport: Viewport { width: 0, height: 10 }, ..base.clone() },
            CaptureRequest { scale_factor: 0.0, ..base.clone() },
            CaptureRequest { scale_factor: 1.5, ..base.clone() },
            CaptureRequest { scale_factor: f64::NAN, ..base.clone() },
            CaptureRequest { max_frames: 0, ..base.clone() },
            CaptureRequest { scroll_step: 0, ..base.clone() },
            CaptureRequest { fps: 0, ..base.clone() },
            CaptureRequest { quality: 0, ..base.clone() },
            CaptureRequest { quality: 31, ..base.clone() },
            CaptureRequest { batch_size: 0, ..base.clone() },
            CaptureRequest {
                viewport: Viewport { width: 1, height: 1 },
                scale_factor: 0.5,
                ..base.clone()
            },
        ];
        for req in cases {
            assert!(
                matches!(req.validate(), Err(Error::ConfigError(_))),
                "expected rejection for {:?}",
                req
            );
        }
    }
}
