use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use jewelry_tryon_core::{
    snapshot, AccessorySettings, AppConfig, AppState, InboundMessage, Indicator, OverlayRenderer,
    OverrideSlot, StillImageSource, TryOnError, TryOnSession, UnavailableSource, VideoSource,
};
use tracing_subscriber::EnvFilter;

fn main() -> jewelry_tryon_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match cli.command {
        Commands::Live(args) => runtime.block_on(run_live(args)),
        Commands::Render(args) => runtime.block_on(run_render(args)),
    }
}

async fn run_live(args: LiveArgs) -> jewelry_tryon_core::Result<()> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(server) = args.server {
        config.transport.host = server;
    }
    if args.secure {
        config.transport.secure = true;
    }
    args.accessories.apply(&mut config.accessories);
    args.overrides.apply(&mut config);
    tracing::info!(endpoint = %config.transport.endpoint(), "starting live mode");

    let mut camera_failed = false;
    let source: Box<dyn VideoSource> = match &args.image {
        Some(path) => match StillImageSource::open(path) {
            Ok(source) => Box::new(source),
            Err(err) => {
                tracing::error!(path = %path.display(), "could not open video source: {err}");
                camera_failed = true;
                Box::new(UnavailableSource)
            }
        },
        None => {
            camera_failed = true;
            Box::new(UnavailableSource)
        }
    };

    let mut session = TryOnSession::new(config, source);
    if let Some(path) = args.snapshot {
        session = session.with_snapshot(path);
    }
    if camera_failed {
        session.app().status.err(Indicator::Camera, "Camera: unavailable");
    }

    let cancel = session.cancel_token();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            on_signal.cancel();
        }
    });
    if let Some(seconds) = args.duration {
        let on_timeout = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            on_timeout.cancel();
        });
    }

    let report = session.run().await?;
    tracing::info!(
        frames_sent = report.frames_sent,
        renders = report.renders,
        reconnects = report.reconnects,
        snapshot = ?report.snapshot,
        "live mode finished"
    );
    Ok(())
}

async fn run_render(args: RenderArgs) -> jewelry_tryon_core::Result<()> {
    tracing::info!(image = ?args.image, landmarks = ?args.landmarks, "rendering still");

    let mut settings = AccessorySettings::default();
    args.accessories.apply(&mut settings);
    let (app, _status) = AppState::new(settings);

    let reply = std::fs::read_to_string(&args.landmarks)?;
    match InboundMessage::parse(&reply) {
        InboundMessage::Face(landmarks) => app.landmarks.replace(landmarks),
        InboundMessage::Absent => tracing::warn!("detector reported no face"),
        InboundMessage::Error(message) => tracing::warn!("detector reported an error: {message}"),
        InboundMessage::Malformed(reason) => {
            return Err(TryOnError::msg(format!("unreadable landmarks file: {reason}")))
        }
    }

    for (slot, path) in args.overrides.entries() {
        app.overrides.load_file(slot, path).await?;
    }

    let mut source = StillImageSource::open(&args.image)?;
    let frame = source
        .frame()
        .ok_or(TryOnError::InvalidInput("image has no pixels"))?;
    let renderer = OverlayRenderer::new(&app);
    let (outcome, composed) = snapshot::render_still(&renderer, &frame);
    tracing::info!(?outcome, "overlay rendered");

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(snapshot::default_file_name(std::time::SystemTime::now())));
    snapshot::export_png(&composed, &output)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Real-time jewelry try-on overlay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stream frames to the detection service and keep the overlay current.
    Live(LiveArgs),
    /// Draw the overlay for one saved detector reply onto a still image.
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct LiveArgs {
    /// JSON config file; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Detection service host and port.
    #[arg(long)]
    server: Option<String>,
    /// Connect with wss instead of ws.
    #[arg(long)]
    secure: bool,
    /// Still image used as the video source.
    #[arg(long)]
    image: Option<PathBuf>,
    /// Write a composed PNG here (file or directory) on exit.
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// Stop after this many seconds.
    #[arg(long)]
    duration: Option<u64>,
    #[command(flatten)]
    accessories: AccessoryArgs,
    #[command(flatten)]
    overrides: OverrideArgs,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Detector reply as JSON.
    #[arg(long)]
    landmarks: PathBuf,
    /// Frame the reply was computed for, unmirrored.
    #[arg(long)]
    image: PathBuf,
    /// Output PNG; defaults to a timestamped name in the working directory.
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[command(flatten)]
    accessories: AccessoryArgs,
    #[command(flatten)]
    overrides: OverrideArgs,
}

/// Enabling flags; giving a style turns the accessory on.
#[derive(Args, Debug)]
struct AccessoryArgs {
    /// Earring style: stud, hoop or drop.
    #[arg(long, value_name = "STYLE")]
    earrings: Option<String>,
    /// Necklace style: plain, pearl or pendant.
    #[arg(long, value_name = "STYLE")]
    necklace: Option<String>,
    /// Nose pin style: dot, stud or ring.
    #[arg(long, value_name = "STYLE")]
    nosepin: Option<String>,
    /// Scale boost applied to every accessory.
    #[arg(long)]
    scale: Option<f32>,
}

impl AccessoryArgs {
    fn apply(&self, settings: &mut AccessorySettings) {
        if let Some(style) = &self.earrings {
            settings.earrings.enabled = true;
            settings.earrings.set_style_str(style);
        }
        if let Some(style) = &self.necklace {
            settings.necklace.enabled = true;
            settings.necklace.set_style_str(style);
        }
        if let Some(style) = &self.nosepin {
            settings.nosepin.enabled = true;
            settings.nosepin.set_style_str(style);
        }
        if let Some(scale) = self.scale {
            settings.set_scale_boost(scale);
        }
    }
}

#[derive(Args, Debug)]
struct OverrideArgs {
    /// Image drawn instead of the procedural earrings.
    #[arg(long)]
    ear_image: Option<PathBuf>,
    /// Image drawn instead of the procedural necklace.
    #[arg(long)]
    neck_image: Option<PathBuf>,
    /// Image drawn instead of the procedural nose pin.
    #[arg(long)]
    nose_image: Option<PathBuf>,
}

impl OverrideArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(path) = &self.ear_image {
            config.overrides.ear = Some(path.clone());
        }
        if let Some(path) = &self.neck_image {
            config.overrides.neck = Some(path.clone());
        }
        if let Some(path) = &self.nose_image {
            config.overrides.nose = Some(path.clone());
        }
    }

    fn entries(&self) -> Vec<(OverrideSlot, &PathBuf)> {
        [
            (OverrideSlot::Ear, &self.ear_image),
            (OverrideSlot::Neck, &self.neck_image),
            (OverrideSlot::Nose, &self.nose_image),
        ]
        .into_iter()
        .filter_map(|(slot, path)| path.as_ref().map(|path| (slot, path)))
        .collect()
    }
}
