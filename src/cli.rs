use crate::avatar::{AvatarResolver, DirectoryAvatarResolver};
use crate::config::{ChartConfig, LayoutConfig, RenderConfig, load_config, resolve};
use crate::document::DocumentFormat;
use crate::fonts::{FastTextMetrics, SystemFonts};
use crate::host::{HostCommand, HostEvent, spawn_host};
use crate::layout::compute_layout;
use crate::layout_dump::{LayoutDump, write_layout_dump};
use crate::render::{render_svg, write_output_svg};
use crate::session::{ChartOutcome, ChartSession};
use anyhow::{Result, anyhow};
use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "orgc", version, about = "Org chart renderer: team frames and person cards from JSON or YAML")]
pub struct Args {
    /// Input file (.json/.yaml) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png/json). Defaults to stdout for SVG and JSON if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config file (JSON or YAML, same keys as the document's `config`)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Input format. Guessed from the extension or the first character when omitted.
    #[arg(long = "format", value_enum)]
    pub format: Option<InputFormat>,

    /// Never look up avatars, whatever the document's config says
    #[arg(long = "no-avatars")]
    pub no_avatars: bool,

    /// Read avatars from `{dir}/{handle}.png` (or jpg/gif/webp) instead of the network
    #[arg(long = "avatar-dir")]
    pub avatar_dir: Option<PathBuf>,

    /// Measure text with built-in character widths instead of system fonts
    #[arg(long = "fast-text")]
    pub fast_text: bool,

    /// Extra directory of font files
    #[arg(long = "font-dir")]
    pub font_dir: Option<PathBuf>,

    /// Width
    #[arg(short = 'w', long = "width", default_value_t = 1200.0)]
    pub width: f32,

    /// Height
    #[arg(short = 'H', long = "height", default_value_t = 800.0)]
    pub height: f32,

    /// More logging (-v info, -vv debug). RUST_LOG wins when set.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum InputFormat {
    Json,
    Yaml,
}

impl From<InputFormat> for DocumentFormat {
    fn from(format: InputFormat) -> Self {
        match format {
            InputFormat::Json => DocumentFormat::Json,
            InputFormat::Yaml => DocumentFormat::Yaml,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut base_config = ChartConfig::default();
    if let Some(file_config) = load_config(args.config.as_deref())? {
        base_config = resolve(&base_config, Some(&file_config))?;
    }
    let render_config = RenderConfig {
        width: args.width,
        height: args.height,
        ..RenderConfig::default()
    };
    let layout_config = LayoutConfig::default();

    let (input, detected) = read_input(args.input.as_deref())?;
    let format = args.format.map(DocumentFormat::from).unwrap_or(detected);

    let mut session = if args.fast_text {
        ChartSession::new(base_config, FastTextMetrics::new(), avatar_resolver(&args)?)
    } else {
        let mut fonts = SystemFonts::new();
        if let Some(dir) = args.font_dir.as_deref() {
            fonts.load_font_dir(dir);
        }
        ChartSession::new(base_config, fonts, avatar_resolver(&args)?)
    }
    .with_layout(layout_config.clone());
    if args.no_avatars {
        session = session.without_avatars();
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let Some(mut outcome) = runtime.block_on(drive_host(session, format, input))? else {
        tracing::info!("closed before the chart finished");
        return Ok(());
    };

    let layout = compute_layout(&mut outcome.scene, &outcome.fonts, &layout_config);
    match args.output_format {
        OutputFormat::Svg => {
            let svg = render_svg(&outcome.scene, &layout, &render_config);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = render_svg(&outcome.scene, &layout, &render_config);
            write_png(&svg, &output, &render_config)?;
        }
        OutputFormat::Json => {
            let dump = LayoutDump::from_scene(&outcome.scene, &layout, outcome.stats);
            write_layout_dump(args.output.as_deref(), &dump)?;
        }
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn avatar_resolver(args: &Args) -> Result<Arc<dyn AvatarResolver>> {
    if let Some(dir) = args.avatar_dir.as_deref() {
        return Ok(Arc::new(DirectoryAvatarResolver::new(dir)));
    }
    #[cfg(feature = "http")]
    {
        Ok(Arc::new(crate::avatar::HttpAvatarResolver::new()?))
    }
    #[cfg(not(feature = "http"))]
    {
        Ok(Arc::new(crate::session::NoAvatars))
    }
}

/// Runs one build through the host shell. Ctrl-C closes the host; that is
/// reported as `None`, not an error.
async fn drive_host(
    session: ChartSession,
    format: DocumentFormat,
    text: String,
) -> Result<Option<ChartOutcome>> {
    let mut host = spawn_host(session, format);
    host.commands
        .send(HostCommand::StartBuild { text })
        .map_err(|_| anyhow!("host stopped before the build started"))?;

    let close = host.commands.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = close.send(HostCommand::Close);
        }
    });

    match host.events.recv().await {
        Some(HostEvent::Finished(outcome)) => Ok(Some(*outcome)),
        Some(HostEvent::Failed(message)) => Err(anyhow!(message)),
        Some(HostEvent::Closed) | None => Ok(None),
    }
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, render_config: &RenderConfig) -> Result<()> {
    crate::render::write_output_png(svg, output, render_config)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _render_config: &RenderConfig) -> Result<()> {
    Err(anyhow!("PNG output needs the `png` feature"))
}

fn read_input(path: Option<&Path>) -> Result<(String, DocumentFormat)> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        let content = std::fs::read_to_string(path)?;
        return Ok((content, DocumentFormat::from_path(path)));
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok((buf, DocumentFormat::Auto))
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!(
        "Output path required for {} output",
        ext
    ))
}
