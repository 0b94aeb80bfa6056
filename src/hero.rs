//! Hero capture: one clipped screenshot of the top of the page.

use crate::artifact::write_artifact;
use crate::{CaptureRequest, ClipRegion, Error, Result, SurfaceHandle};
use log::info;
use std::path::{Path, PathBuf};

/// The hero image on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeroArtifact {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

pub struct HeroCapturer<'a> {
    request: &'a CaptureRequest,
}

impl<'a> HeroCapturer<'a> {
    pub fn new(request: &'a CaptureRequest) -> Self {
        Self { request }
    }

    /// Region captured: the full viewport width, `hero_height` tall.
    pub fn clip(&self) -> ClipRegion {
        ClipRegion::top(self.request.viewport.width, self.request.hero_height)
    }

    /// Load the page on `surface`, screenshot the hero region and write it to `out`.
    pub async fn capture(&self, surface: &SurfaceHandle, out: &Path) -> Result<HeroArtifact> {
        let request = self.request;
        info!("Navigating to {}...", request.url);

        surface.set_viewport(request.viewport).await?;
        surface
            .navigate(&request.url, request.readiness, request.navigation_timeout())
            .await
            .map_err(Error::unreachable)?;

        let settle = request.navigation_settle();
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        let clip = self.clip();
        let png = surface.screenshot(Some(clip)).await?;
        write_artifact(out, &png)?;

        info!(
            "Hero section screenshot saved to: {} ({}x{}px)",
            out.display(),
            clip.width,
            clip.height
        );
        Ok(HeroArtifact {
            path: out.to_path_buf(),
            width: clip.width,
            height: clip.height,
        })
    }
}
