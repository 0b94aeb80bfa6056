use crate::{ClipRegion, Error, Launcher, Readiness, Result, Surface, Viewport};
use log::debug;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

enum Command {
    SetViewport(Viewport, oneshot::Sender<Result<()>>),
    Navigate(String, Readiness, Duration, oneshot::Sender<Result<()>>),
    Evaluate(String, oneshot::Sender<Result<serde_json::Value>>),
    ScrollTo(u32, oneshot::Sender<Result<()>>),
    Screenshot(Option<ClipRegion>, oneshot::Sender<Result<Vec<u8>>>),
    MeasureFullHeight(oneshot::Sender<Result<u32>>),
    Close(oneshot::Sender<Result<()>>),
}

/// An async handle to one rendering surface owned by a dedicated worker thread.
///
/// The worker launches the surface, executes commands one at a time in the
/// order they were sent and drops the surface when the handle is closed or
/// dropped, so the surface is released on every exit path. The surface
/// itself never needs to be `Send`.
pub struct SurfaceHandle {
    cmd_tx: Sender<Command>,
}

impl SurfaceHandle {
    /// Launch a surface on a new worker thread.
    pub async fn open<L: Launcher>(launcher: Arc<L>, viewport: Viewport) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        thread::Builder::new()
            .name("scrollcast-surface".into())
            .spawn(move || {
                let mut surface = match launcher.launch(viewport) {
                    Ok(s) => s,
                    Err(err) => {
                        let _ = init_tx.send(Err(err));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(()));

                while let Ok(cmd) = cmd_rx.recv() {
                    match cmd {
                        Command::SetViewport(viewport, resp) => {
                            let _ = resp.send(surface.set_viewport(viewport));
                        }
                        Command::Navigate(url, readiness, timeout, resp) => {
                            let _ = resp.send(surface.navigate(&url, readiness, timeout));
                        }
                        Command::Evaluate(script, resp) => {
                            let _ = resp.send(surface.evaluate(&script));
                        }
                        Command::ScrollTo(offset, resp) => {
                            let _ = resp.send(surface.scroll_to(offset));
                        }
                        Command::Screenshot(clip, resp) => {
                            let _ = resp.send(surface.screenshot(clip));
                        }
                        Command::MeasureFullHeight(resp) => {
                            let _ = resp.send(surface.measure_full_height());
                        }
                        Command::Close(resp) => {
                            let _ = resp.send(surface.close());
                            debug!("Surface closed");
                            return;
                        }
                    }
                }
                debug!("Surface handle dropped; releasing surface");
            })
            .map_err(|e| Error::InitializationError(format!("Failed to spawn surface worker: {}", e)))?;

        init_rx
            .await
            .map_err(|e| Error::SurfaceClosed(format!("Worker init canceled: {}", e)))??;

        Ok(Self { cmd_tx })
    }

    pub async fn set_viewport(&self, viewport: Viewport) -> Result<()> {
        self.call("SetViewport", |tx| Command::SetViewport(viewport, tx)).await
    }

    /// Navigate and wait for `readiness`, bounded by `timeout`.
    pub async fn navigate(&self, url: &str, readiness: Readiness, timeout: Duration) -> Result<()> {
        let url = url.to_string();
        self.call("Navigate", |tx| Command::Navigate(url, readiness, timeout, tx)).await
    }

    pub async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let script = script.to_string();
        self.call("Evaluate", |tx| Command::Evaluate(script, tx)).await
    }

    pub async fn scroll_to(&self, offset: u32) -> Result<()> {
        self.call("ScrollTo", |tx| Command::ScrollTo(offset, tx)).await
    }

    /// PNG of the viewport, or of `clip` when given.
    pub async fn screenshot(&self, clip: Option<ClipRegion>) -> Result<Vec<u8>> {
        self.call("Screenshot", |tx| Command::Screenshot(clip, tx)).await
    }

    pub async fn measure_full_height(&self) -> Result<u32> {
        self.call("MeasureFullHeight", Command::MeasureFullHeight).await
    }

    /// Release the surface and stop the worker.
    pub async fn close(self) -> Result<()> {
        self.call("Close", Command::Close).await
    }

    async fn call<T>(&self, name: &str, make: impl FnOnce(oneshot::Sender<Result<T>>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .map_err(|_| Error::SurfaceClosed(format!("{} sent to a stopped worker", name)))?;
        rx.await
            .map_err(|e| Error::SurfaceClosed(format!("{} canceled: {}", name, e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{SyntheticLauncher, SyntheticPage};

    #[tokio::test]
    async fn commands_run_in_order_and_close_releases() {
        let launcher = Arc::new(SyntheticLauncher::new(SyntheticPage::with_height(3000)));
        let handle = SurfaceHandle::open(launcher.clone(), Viewport { width: 32, height: 1000 })
            .await
            .unwrap();
        handle.navigate("http://test", Readiness::Load, Duration::from_secs(1)).await.unwrap();
        assert_eq!(handle.measure_full_height().await.unwrap(), 3000);
        handle.scroll_to(100).await.unwrap();
        handle.scroll_to(200).await.unwrap();
        handle.close().await.unwrap();

        let log = launcher.log();
        assert_eq!(log.scrolls, vec![100, 200]);
        assert_eq!(log.launched, 1);
        assert_eq!(log.open_surfaces(), 0);
    }

    #[tokio::test]
    async fn dropping_the_handle_releases_the_surface() {
        let launcher = Arc::new(SyntheticLauncher::new(SyntheticPage::with_height(100)));
        let handle = SurfaceHandle::open(launcher.clone(), Viewport::default()).await.unwrap();
        drop(handle);

        // the worker notices the closed channel asynchronously
        for _ in 0..100 {
            if launcher.log().open_surfaces() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(launcher.log().open_surfaces(), 0);
    }

    #[tokio::test]
    async fn launch_failure_is_reported() {
        let launcher = Arc::new(SyntheticLauncher::new(SyntheticPage {
            fail_launch: true,
            ..Default::default()
        }));
        let err = SurfaceHandle::open(launcher, Viewport::default()).await.err().unwrap();
        assert!(matches!(err, Error::InitializationError(_)));
    }
}
