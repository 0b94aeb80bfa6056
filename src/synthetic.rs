//! Synthetic rendering surface.
//!
//! Renders a page of a fixed content height as a vertical color gradient, so
//! every scroll offset produces a distinguishable frame. Used by tests, benches
//! and demos where launching Chrome is not an option. Failures can be injected
//! and every call is recorded in a shared [`SurfaceLog`].

use crate::{ClipRegion, Error, Launcher, Readiness, Result, Surface, Viewport, FULL_HEIGHT_SCRIPT};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use log::debug;
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Shape of the synthetic page and the failures it should produce.
#[derive(Debug, Clone, Default)]
pub struct SyntheticPage {
    /// Full document height in pixels
    pub content_height: u32,
    /// Refuse to launch
    pub fail_launch: bool,
    /// Every navigation fails as if the host were unreachable
    pub fail_navigation: bool,
    /// Zero-based screenshot (per surface) that fails
    pub fail_screenshot_at: Option<usize>,
    /// Zero-based viewport screenshot (per surface) that returns undecodable bytes
    pub corrupt_screenshot_at: Option<usize>,
}

impl SyntheticPage {
    pub fn with_height(content_height: u32) -> Self {
        Self {
            content_height,
            ..Default::default()
        }
    }
}

/// Everything the synthetic surfaces were asked to do.
#[derive(Debug, Clone, Default)]
pub struct SurfaceLog {
    pub launched: usize,
    pub released: usize,
    pub navigations: Vec<String>,
    pub viewports: Vec<Viewport>,
    /// Scroll offsets as requested, in call order
    pub scrolls: Vec<u32>,
    /// Effective scroll position at each screenshot, in call order
    pub screenshot_offsets: Vec<u32>,
    pub clips: Vec<ClipRegion>,
}

impl SurfaceLog {
    /// Surfaces launched but not yet released.
    pub fn open_surfaces(&self) -> usize {
        self.launched - self.released
    }
}

type SharedLog = Arc<Mutex<SurfaceLog>>;

fn lock(log: &SharedLog) -> MutexGuard<'_, SurfaceLog> {
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Launches [`SyntheticSurface`]s that all share one log.
#[derive(Debug, Clone)]
pub struct SyntheticLauncher {
    page: SyntheticPage,
    log: SharedLog,
}

impl SyntheticLauncher {
    pub fn new(page: SyntheticPage) -> Self {
        Self {
            page,
            log: Arc::new(Mutex::new(SurfaceLog::default())),
        }
    }

    /// Snapshot of the shared call log.
    pub fn log(&self) -> SurfaceLog {
        lock(&self.log).clone()
    }
}

impl Launcher for SyntheticLauncher {
    type Surface = SyntheticSurface;

    fn launch(&self, viewport: Viewport) -> Result<SyntheticSurface> {
        if self.page.fail_launch {
            return Err(Error::InitializationError("synthetic launch failure".into()));
        }
        lock(&self.log).launched += 1;
        Ok(SyntheticSurface {
            page: self.page.clone(),
            viewport,
            scroll_y: 0,
            screenshots: 0,
            loaded: false,
            log: self.log.clone(),
        })
    }
}

/// In-process surface rendering a gradient page.
#[derive(Debug)]
pub struct SyntheticSurface {
    page: SyntheticPage,
    viewport: Viewport,
    scroll_y: u32,
    screenshots: usize,
    loaded: bool,
    log: SharedLog,
}

impl SyntheticSurface {
    /// Color of the page at absolute row `y`.
    pub fn color_at(content_height: u32, y: u32) -> Rgb<u8> {
        let h = content_height.max(1) as u64;
        let t = ((y as u64).min(h) * 255 / h) as u8;
        Rgb([t, 255 - t, 128])
    }

    fn render(&self, top: u32, width: u32, height: u32) -> Result<Vec<u8>> {
        let content_height = self.page.content_height.max(self.viewport.height);
        let img = RgbImage::from_fn(width, height, |_, y| Self::color_at(content_height, top + y));

        let mut png = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| Error::Other(format!("Synthetic PNG encoding failed: {}", e)))?;
        Ok(png)
    }

    fn max_scroll(&self) -> u32 {
        self.page.content_height.saturating_sub(self.viewport.height)
    }
}

impl Surface for SyntheticSurface {
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.viewport = viewport;
        self.scroll_y = self.scroll_y.min(self.max_scroll());
        lock(&self.log).viewports.push(viewport);
        Ok(())
    }

    fn navigate(&mut self, url: &str, _readiness: Readiness, _timeout: Duration) -> Result<()> {
        lock(&self.log).navigations.push(url.to_string());
        if self.page.fail_navigation {
            return Err(Error::UnreachableSource(format!("{} did not respond", url)));
        }
        self.loaded = true;
        self.scroll_y = 0;
        Ok(())
    }

    fn evaluate(&mut self, script: &str) -> Result<serde_json::Value> {
        if !self.loaded {
            return Err(Error::ScriptError("No document loaded".into()));
        }
        if script == FULL_HEIGHT_SCRIPT {
            return Ok(serde_json::json!(self.page.content_height));
        }
        Ok(serde_json::Value::Null)
    }

    fn scroll_to(&mut self, offset: u32) -> Result<()> {
        lock(&self.log).scrolls.push(offset);
        // browsers clamp to the content bounds
        self.scroll_y = offset.min(self.max_scroll());
        Ok(())
    }

    fn screenshot(&mut self, clip: Option<ClipRegion>) -> Result<Vec<u8>> {
        let n = self.screenshots;
        self.screenshots += 1;
        if self.page.fail_screenshot_at == Some(n) {
            return Err(Error::Other(format!("synthetic screenshot {} failed", n)));
        }

        match clip {
            Some(clip) => {
                lock(&self.log).clips.push(clip);
                self.render(clip.y, clip.width, clip.height)
            }
            None => {
                lock(&self.log).screenshot_offsets.push(self.scroll_y);
                if self.page.corrupt_screenshot_at == Some(n) {
                    return Ok(b"not a png".to_vec());
                }
                self.render(self.scroll_y, self.viewport.width, self.viewport.height)
            }
        }
    }

    fn close(self) -> Result<()> {
        // release is counted in Drop
        Ok(())
    }
}

impl Drop for SyntheticSurface {
    fn drop(&mut self) {
        lock(&self.log).released += 1;
        debug!("Synthetic surface released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_is_clamped_to_content() {
        let launcher = SyntheticLauncher::new(SyntheticPage::with_height(1500));
        let mut surface = launcher.launch(Viewport { width: 40, height: 1000 }).unwrap();
        surface.navigate("http://test", Readiness::Load, Duration::ZERO).unwrap();
        surface.scroll_to(900).unwrap();
        surface.screenshot(None).unwrap();
        assert_eq!(surface.measure_full_height().unwrap(), 1500);
        drop(surface);

        let log = launcher.log();
        assert_eq!(log.scrolls, vec![900]);
        assert_eq!(log.screenshot_offsets, vec![500]);
        assert_eq!(log.open_surfaces(), 0);
    }

    #[test]
    fn screenshot_has_requested_size() {
        let launcher = SyntheticLauncher::new(SyntheticPage::with_height(300));
        let mut surface = launcher.launch(Viewport { width: 64, height: 48 }).unwrap();
        surface.navigate("http://test", Readiness::Load, Duration::ZERO).unwrap();

        let png = surface.screenshot(Some(ClipRegion::top(64, 20))).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (64, 20));

        let png = surface.screenshot(None).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (64, 48));
    }

    #[test]
    fn injected_failures() {
        let page = SyntheticPage {
            content_height: 300,
            fail_screenshot_at: Some(1),
            ..Default::default()
        };
        let launcher = SyntheticLauncher::new(page);
        let mut surface = launcher.launch(Viewport { width: 8, height: 8 }).unwrap();
        assert!(surface.screenshot(None).is_ok());
        assert!(surface.screenshot(None).is_err());

        let launcher = SyntheticLauncher::new(SyntheticPage {
            fail_navigation: true,
            ..Default::default()
        });
        let mut surface = launcher.launch(Viewport::default()).unwrap();
        let err = surface.navigate("http://test", Readiness::Load, Duration::ZERO).unwrap_err();
        assert!(err.is_source_unreachable());
    }
}
