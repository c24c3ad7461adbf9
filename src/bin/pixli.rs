use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use pixli::expression::compile::FunctionKind;
use pixli::protocol::dmx::DmxAdapter;
use pixli::protocol::midi::MidiAdapter;
use pixli::protocol::osc::OscAdapter;
use pixli::protocol::websocket::WebSocketAdapter;
use pixli::state::migrate::migrate_json_str;
use pixli::{
    FrameIndex, FrameSink as _, GeneratorState, LiveSession, MemorySceneStore, PixliConfig,
    PngSequenceSink, ProtocolAdapter, Sandbox,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pixli", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Check motion function sources without running them.
    Validate(ValidateArgs),
    /// Run the live loop with the configured protocol adapters.
    Run(RunArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Generator state JSON (current or legacy shape). Defaults apply when omitted.
    #[arg(long)]
    state: Option<PathBuf>,

    /// Session config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Source file declaring `fn path(...)`.
    #[arg(long)]
    path: PathBuf,

    /// Source file declaring `fn scale(t)`.
    #[arg(long)]
    scale: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Session config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial generator state JSON.
    #[arg(long)]
    state: Option<PathBuf>,

    /// Stop after this many frames; runs until interrupted otherwise.
    #[arg(long)]
    frames: Option<u64>,

    /// Mirror every frame into numbered PNGs in this directory.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Override the configured frame rate.
    #[arg(long)]
    fps: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Validate(args) => cmd_validate(args),
        Command::Run(args) => {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("start async runtime")?;
            rt.block_on(cmd_run(args))
        }
    }
}

fn read_config(path: Option<&Path>) -> anyhow::Result<PixliConfig> {
    match path {
        Some(p) => Ok(PixliConfig::load(p)?),
        None => Ok(PixliConfig::default()),
    }
}

fn read_state(path: Option<&Path>) -> anyhow::Result<GeneratorState> {
    let Some(path) = path else {
        return Ok(GeneratorState::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read state '{}'", path.display()))?;
    let state = migrate_json_str(&text).with_context(|| format!("load state '{}'", path.display()))?;
    Ok(state)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let config = read_config(args.config.as_deref())?;
    let state = read_state(args.state.as_deref())?;
    let mut session =
        LiveSession::from_config(&config, state, Arc::new(MemorySceneStore::new()))?;
    let frame = session.frame_at(FrameIndex(args.frame), Instant::now())?;

    if let Some(err) = session.resolver().last_error() {
        tracing::warn!(error = %err, "custom motion rejected, rendered the built-in mode");
    }

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let sandbox = Sandbox::default();
    let mut failed = false;
    let mut check = |path: &Path, kind: FunctionKind| -> anyhow::Result<()> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("read source '{}'", path.display()))?;
        let v = sandbox.validate(&source, kind);
        println!("{}: {}", path.display(), serde_json::to_string(&v)?);
        failed |= !v.valid;
        Ok(())
    };
    check(&args.path, FunctionKind::Path)?;
    if let Some(scale) = &args.scale {
        check(scale, FunctionKind::Scale)?;
    }
    if failed {
        anyhow::bail!("validation failed");
    }
    Ok(())
}

async fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = read_config(args.config.as_deref())?;
    if let Some(fps) = args.fps {
        config.fps = pixli::Fps::new(fps, 1)?;
        config.validate()?;
    }
    let state = read_state(args.state.as_deref())?;
    let mut session =
        LiveSession::from_config(&config, state, Arc::new(MemorySceneStore::new()))?;
    let ctx = session.adapter_context();

    let mut websocket = WebSocketAdapter::new(ctx.clone(), config.websocket.clone());
    let mut midi = MidiAdapter::new(ctx.clone(), config.midi.clone());
    let mut osc = OscAdapter::new(ctx, config.osc.clone());
    let mut dmx = DmxAdapter::new(config.dmx.clone());

    if config.websocket.enabled
        && let Err(e) = websocket.connect().await
    {
        tracing::warn!(error = %e, "websocket unavailable, continuing without it");
    }
    if config.midi.enabled
        && let Err(e) = midi.connect().await
    {
        tracing::warn!(error = %e, "midi unavailable, continuing without it");
    }
    if config.osc.enabled
        && let Err(e) = osc.connect().await
    {
        tracing::warn!(error = %e, "osc unavailable, continuing without it");
    }
    if config.dmx.enabled
        && let Err(e) = dmx.connect().await
    {
        tracing::warn!(error = %e, "dmx unavailable, continuing without it");
    }

    let mut sink = match &args.out_dir {
        Some(dir) => {
            let mut sink = PngSequenceSink::new(dir).skip_repeats(true);
            sink.begin(session.sink_config())?;
            Some(sink)
        }
        None => None,
    };

    let period = Duration::from_secs_f64(config.fps.frame_duration_secs());
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    tracing::info!(
        width = config.canvas.width,
        height = config.canvas.height,
        fps = config.fps.as_f64(),
        "live loop started"
    );

    let mut rendered = 0u64;
    while args.frames.is_none_or(|n| rendered < n) {
        interval.tick().await;
        let tick = session.tick(Instant::now())?;
        if let Some(sink) = sink.as_mut() {
            sink.push_frame(tick.index, &tick.frame)?;
        }
        if dmx.connection_state().is_connected() {
            let palette = session.renderer().palette(&tick.snapshot.state);
            let elapsed = session.fps().frames_to_secs(tick.index.0);
            if let Err(e) = dmx.send_state(&tick.snapshot.state, &palette, elapsed).await {
                tracing::warn!(error = %e, "dmx frame dropped");
            }
        }
        rendered += 1;
    }

    if let Some(sink) = sink.as_mut() {
        sink.end()?;
    }
    websocket.disconnect();
    midi.disconnect();
    osc.disconnect();
    dmx.disconnect();
    session.teardown();

    let stats = session.stats();
    tracing::info!(
        frames = stats.frames,
        applied = stats.deltas_applied,
        rejected = stats.deltas_rejected,
        motion_failures = stats.motion_failures,
        "live loop finished"
    );
    Ok(())
}
