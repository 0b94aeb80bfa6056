//! Chrome DevTools Protocol surface implementation

use crate::{ClipRegion, Error, Launcher, Readiness, Result, Surface, Viewport};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::types::Bounds;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Number of resource-timing entries the page has recorded so far.
const RESOURCE_COUNT_SCRIPT: &str = "performance.getEntriesByType('resource').length";

/// Interval between network quiescence polls.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Map a `headless_chrome` failure into `kind`, keeping its cause chain.
fn chrome_err(kind: fn(String) -> Error, what: &'static str) -> impl Fn(anyhow::Error) -> Error {
    move |e| kind(format!("{}: {:#}", what, e))
}

/// Launches headless Chrome, one browser per surface.
#[derive(Debug, Clone)]
pub struct CdpLauncher {
    /// Chrome executable; located automatically when `None`
    pub chrome_path: Option<PathBuf>,
    /// User agent override
    pub user_agent: Option<String>,
    /// Chrome's own sandbox. Off by default so the capture runs in containers.
    pub sandbox: bool,
}

impl Default for CdpLauncher {
    fn default() -> Self {
        let chrome_path = std::env::var_os("CHROME_PATH")
            .or_else(|| std::env::var_os("PUPPETEER_EXECUTABLE_PATH"))
            .map(PathBuf::from);
        Self {
            chrome_path,
            user_agent: None,
            sandbox: false,
        }
    }
}

impl Launcher for CdpLauncher {
    type Surface = CdpSurface;

    fn launch(&self, viewport: Viewport) -> Result<CdpSurface> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(self.sandbox)
            .window_size(Some((viewport.width, viewport.height)))
            .path(self.chrome_path.clone())
            .args(vec![OsStr::new("--disable-dev-shm-usage"), OsStr::new("--hide-scrollbars")])
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(chrome_err(Error::InitializationError, "Failed to launch browser"))?;

        let tab = browser
            .new_tab()
            .map_err(chrome_err(Error::InitializationError, "Failed to create tab"))?;

        if let Some(ua) = &self.user_agent {
            tab.set_user_agent(ua, None, None)
                .map_err(chrome_err(Error::InitializationError, "Failed to set user agent"))?;
        }

        debug!("Launched headless Chrome at {}x{}", viewport.width, viewport.height);
        Ok(CdpSurface { browser, tab })
    }
}

/// CDP-backed surface (uses the `headless_chrome` crate)
///
/// Holds one browser process and a single tab. Dropping the surface
/// terminates the browser.
pub struct CdpSurface {
    browser: Browser,
    tab: Arc<Tab>,
}

impl CdpSurface {
    fn wait_for_network_idle(&self, idle: Duration, deadline: Instant) -> Result<()> {
        let mut last_count = None;
        let mut quiet_since = Instant::now();

        loop {
            let count = self
                .tab
                .evaluate(RESOURCE_COUNT_SCRIPT, false)
                .map_err(chrome_err(Error::UnreachableSource, "Failed to poll network activity"))?
                .value
                .and_then(|v| v.as_u64());

            let now = Instant::now();
            if count != last_count {
                last_count = count;
                quiet_since = now;
            } else if now.duration_since(quiet_since) >= idle {
                return Ok(());
            }

            if now >= deadline {
                return Err(Error::UnreachableSource(format!(
                    "Network did not go idle within the navigation timeout ({} resources loaded)",
                    last_count.unwrap_or(0)
                )));
            }
            std::thread::sleep(IDLE_POLL);
        }
    }
}

impl Surface for CdpSurface {
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.tab
            .set_bounds(Bounds::Normal {
                left: None,
                top: None,
                width: Some(viewport.width as f64),
                height: Some(viewport.height as f64),
            })
            .map_err(chrome_err(Error::CdpError, "Failed to set viewport"))?;
        Ok(())
    }

    fn navigate(&mut self, url: &str, readiness: Readiness, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        self.tab.set_default_timeout(timeout);

        self.tab
            .navigate_to(url)
            .map_err(chrome_err(Error::UnreachableSource, "Navigation failed"))?;

        self.tab
            .wait_until_navigated()
            .map_err(chrome_err(Error::UnreachableSource, "Wait for navigation failed"))?;

        match readiness {
            Readiness::Load => Ok(()),
            Readiness::NetworkIdle { idle_ms } => {
                self.wait_for_network_idle(Duration::from_millis(idle_ms), deadline)
            }
        }
    }

    fn evaluate(&mut self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(chrome_err(Error::ScriptError, "Evaluation failed"))?;
        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    fn scroll_to(&mut self, offset: u32) -> Result<()> {
        self.evaluate(&format!("window.scrollTo(0, {})", offset))?;
        Ok(())
    }

    fn screenshot(&mut self, clip: Option<ClipRegion>) -> Result<Vec<u8>> {
        let clip = clip.map(|c| Page::Viewport {
            x: c.x as f64,
            y: c.y as f64,
            width: c.width as f64,
            height: c.height as f64,
            scale: 1.0,
        });

        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, clip, true)
            .map_err(chrome_err(Error::CdpError, "Screenshot failed"))
    }

    fn close(self) -> Result<()> {
        // Dropping the browser terminates the child process
        if let Err(e) = self.tab.close(false) {
            warn!("Failed to close tab cleanly: {}", e);
        }
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }
}
