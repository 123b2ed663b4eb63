//! trackc - compile a track description into a static track graph.
//!
//! Reads records from stdin (or `--input`), writes the emitted graph to
//! stdout (or `--output`). Logs go to stderr so stdout only carries data.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::{EnvFilter, prelude::*};
use trackgraph_core::pathfind::{TrackPath, shortest_path_by_name};
use trackgraph_core::{CompileOptions, CompiledTrack, compile_with};
use trackgraph_data::{Config, Format, TrackRecord, detect_format, emit, load_config};

/// Compile a track topology description.
#[derive(Debug, Parser)]
#[command(name = "trackc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile track topology descriptions into static track graphs")]
#[command(long_about = r#"
Reads one record per line (sensor, sep, switch, enter, dist, mutex, calib)
and emits the linked, validated track graph.

Examples:
  trackc track_a < track_a.txt > track_a.json
  trackc track_b --input b.txt --output b.bin
  trackc track_a --input a.txt --route A1 C13
"#)]
struct Cli {
    /// Name recorded in the emitted track
    name: String,

    /// Read records from this file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Write output to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format: json, ron, toml or bitcode
    #[arg(short, long, value_parser = parse_format)]
    format: Option<Format>,

    /// Config file (TOML, RON or JSON)
    #[arg(short, long, env = "TRACKC_CONFIG")]
    config: Option<PathBuf>,

    /// Print the shortest route between two nodes instead of emitting
    #[arg(long, num_args = 2, value_names = ["FROM", "TO"])]
    route: Option<Vec<String>>,

    /// Upper bound on the node array
    #[arg(long)]
    max_nodes: Option<usize>,

    /// Highest allowed sensor address
    #[arg(long)]
    max_sensor_address: Option<u32>,

    /// Fail when an edge has no declared distance
    #[arg(long)]
    require_distances: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_format(s: &str) -> Result<Format, String> {
    s.parse().map_err(|e: trackgraph_data::EmitError| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(&cli)
}

/// Filter used when `RUST_LOG` is unset: the library crates and this binary.
fn default_directives(verbose: u8) -> String {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!("trackgraph={level},trackc={level}")
}

fn init_tracing(verbose: u8) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_filter(env_filter),
        )
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    let options = compile_options(cli, &config);

    let input = read_input(cli.input.as_deref())?;
    let track = compile_with(&input, &options)
        .with_context(|| format!("failed to compile track '{}'", cli.name))?;
    tracing::info!(
        track = %cli.name,
        nodes = track.graph().node_count(),
        edges = track.graph().edge_count(),
        "compiled"
    );

    if let Some(route) = &cli.route {
        let [from, to] = route.as_slice() else {
            bail!("--route takes exactly two node names");
        };
        let text = route_text(&track, from, to)?;
        return write_output(cli.output.as_deref(), text.as_bytes());
    }

    let format = output_format(cli, &config)?;
    let record = TrackRecord::from_compiled(&cli.name, &track);
    let bytes = emit(&record, format).context("failed to emit track")?;
    write_output(cli.output.as_deref(), &bytes)
}

/// Config file values, overridden by command-line flags.
fn compile_options(cli: &Cli, config: &Config) -> CompileOptions {
    let mut options = config.compile.clone();
    if cli.max_nodes.is_some() {
        options.max_nodes = cli.max_nodes;
    }
    if cli.max_sensor_address.is_some() {
        options.max_sensor_address = cli.max_sensor_address;
    }
    options.require_distances |= cli.require_distances;
    options
}

/// `--format`, then the output file extension, then the config, then JSON.
fn output_format(cli: &Cli, config: &Config) -> Result<Format> {
    if let Some(format) = cli.format {
        return Ok(format);
    }
    if let Some(path) = &cli.output
        && path.extension().is_some()
    {
        return detect_format(path).context("pass --format to choose an output format");
    }
    Ok(config.output.format.unwrap_or_default())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes).context("failed to write stdout")?;
            stdout.flush().context("failed to write stdout")
        }
    }
}

fn route_text(track: &CompiledTrack, from: &str, to: &str) -> Result<String> {
    let graph = track.graph();
    for name in [from, to] {
        if graph.node_id(name).is_none() {
            bail!("unknown node '{name}'");
        }
    }
    let Some(path) = shortest_path_by_name(graph, from, to) else {
        bail!("no route from '{from}' to '{to}'");
    };
    Ok(format_route(track, &path))
}

fn format_route(track: &CompiledTrack, path: &TrackPath) -> String {
    let names: Vec<String> = path
        .nodes
        .iter()
        .map(|&n| track.graph().name_of(n))
        .collect();
    format!("{} ({}mm)\n", names.join(" -> "), path.distance_mm)
}
