use std::{
    fs::File,
    io::{BufReader, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Render a print-sized map image of a geographic area.
#[derive(Parser, Debug)]
#[command(name = "mapshot", version, disable_help_flag = true)]
struct Cli {
    /// Area to render as `west,south,east,north` in degrees.
    #[arg(short, long, allow_hyphen_values = true)]
    bounds: String,

    /// Output width: pixels, or a length in `in`, `cm`, `mm`, `pt`.
    #[arg(short, long, default_value = "11in")]
    width: String,

    /// Output height: pixels, or a length in `in`, `cm`, `mm`, `pt`.
    #[arg(short = 'h', long, default_value = "8.5in")]
    height: String,

    /// Output resolution in dots per inch.
    #[arg(short, long, default_value_t = 144.0)]
    dpi: f64,

    /// Image format: `png`, `jpeg` or `webp`.
    #[arg(short, long, default_value = "png")]
    format: String,

    /// Lossy quality in `(0, 1]`.
    #[arg(short, long, default_value_t = 0.9)]
    quality: f32,

    /// Output file. Writes to stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Style JSON for the software renderer.
    #[arg(long)]
    style: Option<PathBuf>,

    /// Per-section pixel budget. Derived from the renderer's limits when omitted.
    #[arg(long)]
    max_pixels: Option<u64>,

    /// Longest wait, in milliseconds, for each render phase of a section.
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// Print help.
    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let pixel_ratio = mapshot::units::pixel_ratio_for_dpi(cli.dpi)?;
    let bounds = mapshot::units::parse_bounds(&cli.bounds)?;
    let width = mapshot::units::parse_length_to_pixels(&cli.width, pixel_ratio)
        .with_context(|| format!("parse width '{}'", cli.width))?;
    let height = mapshot::units::parse_length_to_pixels(&cli.height, pixel_ratio)
        .with_context(|| format!("parse height '{}'", cli.height))?;

    let mut cfg = mapshot::ExportConfig::new(bounds, width, height);
    cfg.pixel_ratio = pixel_ratio;
    cfg.format = mapshot::units::parse_format(&cli.format);
    cfg.quality = cli.quality;
    cfg.max_pixels = cli.max_pixels;
    cfg.settle_timeout_ms = cli.timeout_ms;
    cfg.frame_timeout_ms = cli.timeout_ms;
    cfg.validate()?;

    let style = match &cli.style {
        Some(path) => read_style_json(path)?,
        None => mapshot::MapStyle::default(),
    };
    let mut backend = mapshot::CpuMapRenderer::new(mapshot::CpuRendererOpts {
        style,
        ..mapshot::CpuRendererOpts::default()
    })?;

    let cwd = std::env::current_dir().context("resolve current directory")?;
    let target = mapshot::OutputTarget::resolve(cli.output.as_deref(), &cwd);
    let out = target.open().with_context(|| format!("open output {target:?}"))?;
    let mut encoder = mapshot::create_encoder(cfg.format, cfg.quality, out);

    tracing::info!(width, height, format = cfg.format.mime(), "rendering map");
    let stats = mapshot::export_map(&cfg, &mut backend, encoder.as_mut())?;
    drop(encoder);
    if target == mapshot::OutputTarget::Stdout {
        std::io::stdout().flush().context("flush stdout")?;
    }

    tracing::info!(sections = stats.sections, "saved {width}x{height} image");
    Ok(())
}

fn read_style_json(path: &Path) -> anyhow::Result<mapshot::MapStyle> {
    let f = File::open(path).with_context(|| format!("open style '{}'", path.display()))?;
    let style: mapshot::MapStyle = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse style JSON '{}'", path.display()))?;
    style.validate()?;
    Ok(style)
}
