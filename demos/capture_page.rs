//! Runs the full pipeline on a synthetic 3000px page (no Chrome needed)

use scrollcast::synthetic::{SyntheticLauncher, SyntheticPage};
use scrollcast::{CaptureRequest, OutputPaths, Pipeline, Viewport};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Scrollcast - Synthetic Capture Example\n");

    let request = CaptureRequest {
        url: "http://synthetic.example/".to_string(),
        viewport: Viewport {
            width: 640,
            height: 360,
        },
        hero_height: 200,
        scroll_step: 20,
        max_frames: 60,
        navigation_settle_ms: 0,
        scroll_settle_ms: 0,
        ..Default::default()
    };

    println!("Request:");
    println!("  Viewport: {}x{}", request.viewport.width, request.viewport.height);
    println!("  Scroll step: {}px, frame cap: {}", request.scroll_step, request.max_frames);
    println!("  Scaled size: {:?}\n", request.scaled_size());

    let launcher = SyntheticLauncher::new(SyntheticPage::with_height(3000));
    let pipeline = Pipeline::new(launcher, request)?;

    let outputs = OutputPaths::in_dir("demo-output");
    let artifacts = pipeline.run(&outputs).await?;

    if let Some(hero) = &artifacts.hero {
        println!("Hero: {} ({}x{})", hero.path.display(), hero.width, hero.height);
    }
    if let Some(gif) = &artifacts.animation {
        println!(
            "GIF: {} ({} frames, {} bytes)",
            gif.path.display(),
            gif.frame_count,
            gif.bytes
        );
    }

    println!("Done!");
    Ok(())
}
