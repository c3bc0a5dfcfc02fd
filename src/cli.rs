use crate::config::{ConfigOverlay, load_config};
use crate::ir::{Funnel, parse_json_value};
use crate::layout_dump::write_layout_dump;
use crate::render::{render_document, render_svg, write_output};
use crate::widget::{Mount, WidgetPayload, render};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sbc", version, about = "Funnel bar charts with sankey ribbons")]
pub struct Args {
    /// Input file (stage array or widget payload, JSON/JSON5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for HTML/SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "html")]
    pub output_format: OutputFormat,

    /// Chart config file (JSON or JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Container width
    #[arg(short = 'w', long = "width", default_value_t = 800.0)]
    pub width: f64,

    /// Chart height; overrides the config
    #[arg(short = 'H', long = "height")]
    pub height: Option<f64>,

    /// Write the computed layout as JSON
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,

    /// Page title for HTML output
    #[arg(long = "title", default_value = "Funnel")]
    pub title: String,

    /// Log output format (filtered by RUST_LOG, default `warn`)
    #[arg(long = "log-format", value_enum, default_value = "pretty")]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Html,
    Svg,
    Png,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format)?;

    let mut config = load_config(args.config.as_deref())?;
    let input = read_input(args.input.as_deref())?;
    let (mut funnel, options) = parse_input(&input)?;
    if let Some(options) = options {
        let overlay: ConfigOverlay = serde_json::from_value(options)?;
        config.apply(overlay)?;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    config.validate()?;

    let mut mount = Mount::new("sbc", args.width, config.height);
    let layout = render(&mut mount, &mut funnel, &config)?;
    info!(stages = funnel.len(), width = layout.width, "chart rendered");

    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, &layout, &funnel)?;
    }

    match args.output_format {
        OutputFormat::Html => {
            let doc = render_document(&layout, &config, &args.title);
            write_output(&doc, args.output.as_deref())?;
        }
        OutputFormat::Svg => {
            write_output(&render_svg(&layout, &config), args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_png(&render_svg(&layout, &config), &output)?;
        }
    }

    Ok(())
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path) -> Result<()> {
    crate::render::write_output_png(svg, output)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let result = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

/// Accepts either a bare stage array or a widget payload with `data` and
/// `options`; returns the stages and any embedded options.
fn parse_input(input: &str) -> Result<(Funnel, Option<serde_json::Value>)> {
    let value = parse_json_value(input)?;
    if value.get("data").is_some() {
        let payload: WidgetPayload = serde_json::from_value(value)?;
        let funnel = Funnel::from_table(&payload.data)?;
        let options = (!payload.options.is_null()).then_some(payload.options);
        return Ok((funnel, options));
    }
    let funnel: Funnel = serde_json::from_value(value)?;
    funnel.validate()?;
    Ok((funnel, None))
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
