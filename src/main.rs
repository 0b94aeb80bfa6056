use clap::Parser;
use log::{error, info};
use scrollcast::cdp::CdpLauncher;
use scrollcast::{CaptureRequest, Error, FailureKind, OutputPaths, Pipeline};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

/// Capture a web page as a hero PNG and a scrolling GIF.
#[derive(Parser, Debug)]
#[command(name = "scrollcast", version, about)]
struct Cli {
    /// Page to capture
    url: String,

    /// JSON file with capture options (camelCase names); flags override it
    #[arg(long)]
    options: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long)]
    hero_height: Option<u32>,
    #[arg(long)]
    fps: Option<u32>,
    #[arg(long)]
    scroll_step: Option<u32>,
    /// 1 (best) to 30 (fastest)
    #[arg(long)]
    quality: Option<u32>,
    #[arg(long)]
    max_frames: Option<u32>,
    #[arg(long)]
    scale_factor: Option<f64>,
    /// Loop count, 0 loops forever
    #[arg(long)]
    repeat: Option<u16>,

    /// Skip the hero screenshot
    #[arg(long)]
    no_hero: bool,
    /// Skip the scrolling GIF
    #[arg(long)]
    no_animation: bool,

    /// Output directory for both artifacts
    #[arg(long, default_value = "output")]
    out_dir: PathBuf,
    /// Root for transient frame storage (defaults to the system temp dir)
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Check the page loads before capturing
    #[arg(long)]
    probe: bool,
}

impl Cli {
    fn request(&self) -> scrollcast::Result<CaptureRequest> {
        let mut request = match &self.options {
            Some(path) => CaptureRequest::from_json_file(path)?,
            None => CaptureRequest::default(),
        };
        request.url = self.url.clone();

        if let Some(v) = self.width {
            request.viewport.width = v;
        }
        if let Some(v) = self.height {
            request.viewport.height = v;
        }
        if let Some(v) = self.hero_height {
            request.hero_height = v;
        }
        if let Some(v) = self.fps {
            request.fps = v;
        }
        if let Some(v) = self.scroll_step {
            request.scroll_step = v;
        }
        if let Some(v) = self.quality {
            request.quality = v;
        }
        if let Some(v) = self.max_frames {
            request.max_frames = v;
        }
        if let Some(v) = self.scale_factor {
            request.scale_factor = v;
        }
        if let Some(v) = self.repeat {
            request.repeat = v;
        }
        if self.no_hero {
            request.capture_hero = false;
        }
        if self.no_animation {
            request.capture_animation = false;
        }
        Ok(request)
    }
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "[{} {style}{}{style:#} {}] {}",
                buf.timestamp_seconds(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

async fn run(cli: Cli) -> scrollcast::Result<()> {
    let request = cli.request()?;
    info!("Processing request with URL: {}", request.url);

    let mut pipeline = Pipeline::new(CdpLauncher::default(), request)?;
    if let Some(root) = &cli.frames_dir {
        pipeline = pipeline.with_frames_dir(root);
    }

    if cli.probe {
        pipeline.probe().await?;
    }

    let artifacts = pipeline.run(&OutputPaths::in_dir(&cli.out_dir)).await?;

    let summary = serde_json::json!({
        "url": pipeline.request().url,
        "outputs": {
            "heroImage": artifacts.hero.as_ref().map(|h| h.path.display().to_string()),
            "scrollingGif": artifacts.animation.as_ref().map(|a| a.path.display().to_string()),
            "frames": artifacts.animation.as_ref().map(|a| a.frame_count),
        }
    });
    let pretty = serde_json::to_string_pretty(&summary).map_err(|e| Error::Other(e.to_string()))?;
    println!("{}", pretty);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logger();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            match e.kind() {
                FailureKind::SourceUnreachable => ExitCode::from(2),
                FailureKind::Internal => ExitCode::from(1),
            }
        }
    }
}
