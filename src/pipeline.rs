//! Pipeline orchestration.
//!
//! One run has two independent phases, each on its own freshly launched
//! surface:
//!
//! 1. hero: navigate, clip the top of the page, write a PNG
//! 2. animation: navigate, plan, capture, downscale, encode, write a GIF
//!
//! The surface of a phase is released on every exit path and the per-run
//! frame directory is removed whether the phase succeeds or not. Artifacts of
//! a phase that completed are left in place when a later phase fails.

use crate::capture::FrameCapturer;
use crate::encode::{encode_animation, EncoderSettings};
use crate::frames::FrameStore;
use crate::hero::HeroCapturer;
use crate::transform::FrameTransformer;
use crate::{CaptureRequest, Error, Launcher, Readiness, Result, SurfaceHandle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub use crate::encode::AnimationArtifact;
pub use crate::hero::HeroArtifact;

/// Timeout of the reachability probe navigation.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Where the two artifacts are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub hero: PathBuf,
    pub animation: PathBuf,
}

impl OutputPaths {
    /// `hero-section.png` and `website-smooth-scroll.gif` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            hero: dir.join("hero-section.png"),
            animation: dir.join("website-smooth-scroll.gif"),
        }
    }
}

/// Artifacts produced by a run; `None` for a disabled phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    pub hero: Option<HeroArtifact>,
    pub animation: Option<AnimationArtifact>,
}

/// Runs one [`CaptureRequest`] against surfaces from a [`Launcher`].
pub struct Pipeline<L: Launcher> {
    launcher: Arc<L>,
    request: CaptureRequest,
    frames_root: Option<PathBuf>,
}

impl<L: Launcher> Pipeline<L> {
    /// Validate `request` and build a pipeline for it.
    pub fn new(launcher: L, request: CaptureRequest) -> Result<Self> {
        Self::with_shared_launcher(Arc::new(launcher), request)
    }

    pub fn with_shared_launcher(launcher: Arc<L>, request: CaptureRequest) -> Result<Self> {
        request.validate()?;
        Ok(Self {
            launcher,
            request,
            frames_root: None,
        })
    }

    /// Keep transient frames under `root` instead of the system temp dir.
    pub fn with_frames_dir(mut self, root: impl Into<PathBuf>) -> Self {
        self.frames_root = Some(root.into());
        self
    }

    pub fn request(&self) -> &CaptureRequest {
        &self.request
    }

    /// Check that the page loads at all before committing to a full run.
    pub async fn probe(&self) -> Result<()> {
        let surface = SurfaceHandle::open(self.launcher.clone(), self.request.viewport).await?;
        let result = surface
            .navigate(&self.request.url, Readiness::Load, PROBE_TIMEOUT)
            .await
            .map_err(|e| match Error::unreachable(e) {
                Error::UnreachableSource(reason) => Error::UnreachableSource(format!(
                    "Unable to access {}. The site might be blocking automated access: {}",
                    self.request.url, reason
                )),
                other => other,
            });
        release(surface, "probe").await;
        result
    }

    /// Run every enabled phase, hero first.
    pub async fn run(&self, outputs: &OutputPaths) -> Result<Artifacts> {
        let mut artifacts = Artifacts::default();

        if self.request.capture_hero {
            info!("Capturing hero section of {}", self.request.url);
            let hero = self.capture_hero(&outputs.hero).await.map_err(|e| {
                error!("Hero capture failed: {}", e);
                e
            })?;
            artifacts.hero = Some(hero);
        }

        if self.request.capture_animation {
            info!("Starting scrolling capture for {}", self.request.url);
            let animation = self.capture_animation(&outputs.animation).await.map_err(|e| {
                error!("Scrolling capture failed: {}", e);
                e
            })?;
            artifacts.animation = Some(animation);
        }

        info!("Process finished successfully");
        Ok(artifacts)
    }

    /// Hero phase on its own surface.
    pub async fn capture_hero(&self, out: &Path) -> Result<HeroArtifact> {
        let surface = SurfaceHandle::open(self.launcher.clone(), self.request.viewport).await?;
        let result = HeroCapturer::new(&self.request).capture(&surface, out).await;
        release(surface, "hero").await;
        result
    }

    /// Animation phase on its own surface and frame store.
    pub async fn capture_animation(&self, out: &Path) -> Result<AnimationArtifact> {
        let store = FrameStore::create(self.frames_root.as_deref())?;
        let result = self.animate(&store, out).await;

        if let Err(e) = store.close() {
            warn!("Failed to remove transient frames: {}", e);
        }
        result
    }

    async fn animate(&self, store: &FrameStore, out: &Path) -> Result<AnimationArtifact> {
        let surface = SurfaceHandle::open(self.launcher.clone(), self.request.viewport).await?;
        let captured = FrameCapturer::new(&surface, &self.request).run(store).await;
        // everything past capture works on files only
        release(surface, "animation").await;
        let capture = captured?;
        info!(
            "All {} frames captured. Processing and creating GIF...",
            capture.frames.len()
        );

        let scaled = FrameTransformer::from_request(&self.request)
            .transform(store, capture.frames)
            .await?;

        let (width, height) = self.request.scaled_size();
        let settings = EncoderSettings::from_request(&self.request);
        let out = out.to_path_buf();
        let artifact = tokio::task::spawn_blocking(move || encode_animation(scaled, width, height, &settings, &out))
            .await
            .map_err(|e| Error::EncodeError(format!("Encoder task failed: {}", e)))??;

        info!("GIF created successfully: {}", artifact.path.display());
        Ok(artifact)
    }
}

async fn release(surface: SurfaceHandle, phase: &str) {
    if let Err(e) = surface.close().await {
        warn!("Failed to release {} surface cleanly: {}", phase, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{SyntheticLauncher, SyntheticPage};
    use crate::Viewport;

    fn request() -> CaptureRequest {
        CaptureRequest {
            viewport: Viewport { width: 40, height: 30 },
            hero_height: 10,
            navigation_settle_ms: 0,
            scroll_settle_ms: 0,
            ..CaptureRequest::for_url("http://synthetic.test/")
        }
    }

    #[test]
    fn default_output_names() {
        let paths = OutputPaths::in_dir("output");
        assert_eq!(paths.hero, PathBuf::from("output/hero-section.png"));
        assert_eq!(paths.animation, PathBuf::from("output/website-smooth-scroll.gif"));
    }

    #[test]
    fn invalid_request_is_rejected_up_front() {
        let req = CaptureRequest { max_frames: 0, ..request() };
        let launcher = SyntheticLauncher::new(SyntheticPage::with_height(100));
        assert!(matches!(Pipeline::new(launcher, req), Err(Error::ConfigError(_))));
    }

    #[tokio::test]
    async fn disabled_phases_are_skipped() {
        let launcher = Arc::new(SyntheticLauncher::new(SyntheticPage::with_height(100)));
        let req = CaptureRequest {
            capture_animation: false,
            ..request()
        };
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::with_shared_launcher(launcher.clone(), req).unwrap();
        let artifacts = pipeline.run(&OutputPaths::in_dir(dir.path())).await.unwrap();

        assert!(artifacts.hero.is_some());
        assert!(artifacts.animation.is_none());
        assert!(!dir.path().join("website-smooth-scroll.gif").exists());
        assert_eq!(launcher.log().launched, 1);
    }

    #[tokio::test]
    async fn probe_reports_unreachable_source() {
        let launcher = Arc::new(SyntheticLauncher::new(SyntheticPage {
            fail_navigation: true,
            ..Default::default()
        }));
        let pipeline = Pipeline::with_shared_launcher(launcher.clone(), request()).unwrap();
        let err = pipeline.probe().await.unwrap_err();
        assert!(err.is_source_unreachable());
        assert!(err.to_string().contains("blocking automated access"));
        assert_eq!(launcher.log().open_surfaces(), 0);
    }

    #[tokio::test]
    async fn probe_succeeds_on_reachable_page() {
        let launcher = SyntheticLauncher::new(SyntheticPage::with_height(100));
        let pipeline = Pipeline::new(launcher, request()).unwrap();
        assert!(pipeline.probe().await.is_ok());
    }
}
