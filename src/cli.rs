use crate::config::load_config;
use crate::ir::Graph;
use crate::layout::{CharWidthSizer, LabelSizer, Layout, compute_layout};
use crate::layout_dump::{LayoutDump, write_layout_dump};
use crate::text_metrics::FontMetricsSizer;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "mmdl",
    version,
    about = "Lay out diagram graphs and print node boxes and edge paths as JSON"
)]
pub struct Args {
    /// Input graph (.json or .json5) or '-' for stdin. A top-level array
    /// lays out every graph in it.
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Layout config JSON file (camelCase knobs)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Size labels from the built-in width table instead of installed fonts
    #[arg(long = "fastText")]
    pub fast_text: bool,

    /// Emit single-line JSON
    #[arg(long)]
    pub compact: bool,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())
        .with_context(|| format!("failed to load config {:?}", args.config))?;
    let (input, json5) = read_input(args.input.as_deref())?;
    let graphs = parse_graphs(&input, json5)?;
    if graphs.is_empty() {
        return Err(anyhow::anyhow!("No graphs found in input"));
    }

    let sizer: &dyn LabelSizer = if args.fast_text {
        &CharWidthSizer
    } else {
        &FontMetricsSizer
    };

    let mut layouts: Vec<Layout> = Vec::with_capacity(graphs.len());
    for (idx, graph) in graphs.iter().enumerate() {
        let layout = compute_layout(graph, &config, sizer)
            .with_context(|| format!("graph #{idx} ({:?}) could not be laid out", graph.kind))?;
        tracing::info!(
            graph = idx,
            nodes = layout.nodes.len(),
            edges = layout.edges.len(),
            width = layout.width,
            height = layout.height,
            "layout complete"
        );
        layouts.push(layout);
    }

    if let [layout] = layouts.as_slice() {
        return match args.output.as_deref() {
            Some(path) => write_layout_dump(path, layout, args.compact),
            None => write_stdout(&LayoutDump::from_layout(layout), args.compact),
        };
    }

    let dumps: Vec<LayoutDump<'_>> = layouts.iter().map(LayoutDump::from_layout).collect();
    match args.output.as_deref() {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            let mut writer = io::BufWriter::new(file);
            write_json(&mut writer, &dumps, args.compact)?;
            writer.flush()?;
            Ok(())
        }
        None => write_stdout(&dumps, args.compact),
    }
}

fn write_stdout<T: serde::Serialize>(value: &T, compact: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_json(&mut handle, value, compact)?;
    writeln!(handle)?;
    Ok(())
}

fn write_json<W: Write, T: serde::Serialize>(writer: W, value: &T, compact: bool) -> Result<()> {
    if compact {
        serde_json::to_writer(writer, value)?;
    } else {
        serde_json::to_writer_pretty(writer, value)?;
    }
    Ok(())
}

/// Returns the input text and whether it should be read as JSON5.
fn read_input(path: Option<&Path>) -> Result<(String, bool)> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok((buf, false));
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let is_json5 = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json5"))
            .unwrap_or(false);
        return Ok((content, is_json5));
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok((buf, false))
}

/// One graph object or an array of them. Plain JSON that fails to parse is
/// retried as JSON5 so hand-written files with comments still load.
fn parse_graphs(input: &str, json5: bool) -> Result<Vec<Graph>> {
    let value: serde_json::Value = if json5 {
        json5::from_str(input)?
    } else {
        match serde_json::from_str(input) {
            Ok(value) => value,
            Err(err) => json5::from_str(input).map_err(|_| err)?,
        }
    };
    let graphs = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Graph>, _>>()?,
        other => vec![serde_json::from_value(other)?],
    };
    Ok(graphs)
}
