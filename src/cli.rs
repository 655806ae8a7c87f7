use crate::config::load_config;
use crate::layout_dump::write_layout_dump;
#[cfg(feature = "png")]
use crate::render::write_output_png;
use crate::render::{render_svg, write_output_svg};
use crate::tree::parse_tree_document;
use crate::view::DiagramView;
use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing::{debug, info, warn};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(
    name = "ptree",
    version,
    about = "Render a program/product/project/topic portfolio tree"
)]
pub struct Args {
    /// Tree document (.json / .json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. SVG and JSON go to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON/JSON5 file (theme, themeVariables, layout)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Expand a node before rendering (repeatable)
    #[arg(long = "expand", value_name = "ID")]
    pub expand: Vec<String>,

    /// Expand every node that has children
    #[arg(long = "expand-all", conflicts_with = "expand")]
    pub expand_all: bool,

    /// Toggle a node after the expansions are applied (repeatable, in order)
    #[arg(long = "toggle", value_name = "ID")]
    pub toggle: Vec<String>,

    /// PNG canvas width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// PNG canvas height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Debug output: -d info, -dd debug, -ddd trace
    #[arg(short = 'd', long = "debug", action = ArgAction::Count)]
    pub debug: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.debug);
    execute(&args)
}

fn execute(args: &Args) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }

    let input = read_input(args.input.as_deref())?;
    let forest = parse_tree_document(&input).context("failed to load tree document")?;
    info!(nodes = forest.len(), roots = forest.roots().len(), "tree loaded");

    let mut view = DiagramView::with_config(forest, config.layout.clone());
    if args.expand_all {
        view.expand_all();
    } else if !args.expand.is_empty() {
        for id in args.expand.iter().filter(|id| !view.forest().is_expandable(id)) {
            warn!(%id, "--expand ignored: unknown id or node without children");
        }
        view.set_expanded(&args.expand);
    }
    for id in &args.toggle {
        if !view.toggle(id) {
            warn!(%id, "--toggle ignored: unknown id or node without children");
        }
    }

    let measured = view.measure_with_builtin_host(&config.theme);
    let layout = view.layout();
    debug!(
        generation = layout.generation.value(),
        measured,
        connectors = layout.connectors.len(),
        "layout ready"
    );

    match args.output_format {
        OutputFormat::Svg => {
            let svg = render_svg(&layout, &config.theme, &config.layout);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Json => {
            write_layout_dump(args.output.as_deref(), &layout)?;
        }
        OutputFormat::Png => {
            let output = ensure_output(args.output.as_deref(), "png")?;
            write_png(&render_svg(&layout, &config.theme, &config.layout), output, &config)?;
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, config: &crate::config::Config) -> Result<()> {
    write_output_png(svg, output, &config.render)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _config: &crate::config::Config) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn ensure_output<'a>(output: Option<&'a Path>, ext: &str) -> Result<&'a Path> {
    output.ok_or_else(|| anyhow::anyhow!("output path required for {ext} output"))
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_names(false);
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .try_init();
}
