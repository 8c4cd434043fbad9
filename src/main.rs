use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use geoforce::io::{read_config, read_graph, write_json};
use geoforce::{
    FrameSnapshot, Graph, GraphData, JsonLinesSink, LatLng, MapView, NullSink, Point, RenderSink,
    Simulation, SimulationConfig,
};

/// Force-directed layout of geo graphs over a tiled map.
#[derive(Parser)]
#[command(name = "geoforce")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a layout and write the settled positions
    Simulate(SimulateArgs),
    /// Validate a graph document (and optionally a layout config)
    Check {
        /// Graph document (.json, .yaml)
        #[arg(short, long)]
        input: PathBuf,

        /// Layout config (.yaml, .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SimulateArgs {
    /// Graph document (.json, .yaml)
    #[arg(short, long)]
    input: PathBuf,

    /// Layout config (.yaml, .json); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Map center as LAT,LON
    #[arg(long, value_parser = parse_lat_lng, allow_hyphen_values = true)]
    center: LatLng,

    /// Map zoom level
    #[arg(long)]
    zoom: f64,

    /// Viewport width in pixels
    #[arg(long, default_value = "1024")]
    width: f64,

    /// Viewport height in pixels
    #[arg(long, default_value = "768")]
    height: f64,

    /// Tick budget for each settle
    #[arg(long, default_value = "1000")]
    max_ticks: usize,

    /// View change as LAT,LON,ZOOM, applied in order after the first settle
    #[arg(long = "view", value_parser = parse_view, allow_hyphen_values = true)]
    views: Vec<ViewChange>,

    /// Write every frame as JSON lines to this file
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Write the final layout here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// A pan and zoom of the map, as the host would report it
#[derive(Debug, Clone, Copy, PartialEq)]
struct ViewChange {
    center: LatLng,
    zoom: f64,
}

fn parse_number(s: &str, what: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid {what} `{s}`: {e}"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{what} must be finite, got `{s}`"))
    }
}

fn parse_lat_lng(s: &str) -> Result<LatLng, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got `{s}`"))?;
    Ok(LatLng::new(
        parse_number(lat, "latitude")?,
        parse_number(lon, "longitude")?,
    ))
}

fn parse_view(s: &str) -> Result<ViewChange, String> {
    let (center, zoom) = s
        .rsplit_once(',')
        .ok_or_else(|| format!("expected LAT,LON,ZOOM, got `{s}`"))?;
    Ok(ViewChange {
        center: parse_lat_lng(center)?,
        zoom: parse_number(zoom, "zoom")?,
    })
}

/// Settled layout written by `simulate`
#[derive(Serialize)]
struct LayoutOutput {
    view: MapView,
    settled: bool,
    #[serde(flatten)]
    frame: FrameSnapshot,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(input: &Path, config: Option<&Path>) -> anyhow::Result<(GraphData, SimulationConfig)> {
    let data = read_graph(input)
        .with_context(|| format!("failed to read graph from {}", input.display()))?;
    let config = read_config(config).context("failed to load layout config")?;
    Ok((data, config))
}

/// Settle at the initial view, then replay each view change
fn run<S: RenderSink>(
    data: &GraphData,
    config: &SimulationConfig,
    args: &SimulateArgs,
    sink: S,
) -> anyhow::Result<(LayoutOutput, S)> {
    let mut view = MapView::new(args.center, args.zoom, args.width, args.height);
    let mut sim = Simulation::from_data(data, &view, config, sink)
        .context("failed to set up simulation")?;

    sim.run_until_settled(args.max_ticks);
    for change in &args.views {
        view = view.pan_to(change.center).zoom_to(change.zoom);
        sim.apply_view_change(&view, config.alpha)?;
        sim.run_until_settled(args.max_ticks);
    }

    let output = LayoutOutput {
        view,
        settled: sim.is_settled(),
        frame: sim.snapshot(),
    };
    let (_, sink) = sim.into_parts();
    Ok((output, sink))
}

fn simulate(args: &SimulateArgs) -> anyhow::Result<()> {
    let (data, config) = load(&args.input, args.config.as_deref())?;

    let output = match &args.frames {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let sink = JsonLinesSink::new(BufWriter::new(file));
            let (output, mut sink) = run(&data, &config, args, sink)?;
            sink.flush()
                .with_context(|| format!("failed to write frames to {}", path.display()))?;
            if sink.failures() > 0 {
                anyhow::bail!(
                    "{} frame(s) could not be written to {}",
                    sink.failures(),
                    path.display()
                );
            }
            output
        }
        None => run(&data, &config, args, NullSink)?.0,
    };

    match &args.output {
        Some(path) => {
            write_json(&output, path)
                .with_context(|| format!("failed to write layout to {}", path.display()))?;
            println!(
                "Laid out {} nodes in {} ticks, written to {}",
                output.frame.nodes.len(),
                output.frame.tick,
                path.display()
            );
        }
        None => println!("{}", serde_json::to_string_pretty(&output)?),
    }
    Ok(())
}

fn check(input: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let (data, config) = load(input, config)?;
    // Positions are irrelevant here, only id resolution
    let origin = |_: LatLng| Point::ORIGIN;
    let graph = Graph::from_data_with_radius(&data, &origin, config.default_radius)
        .with_context(|| format!("invalid graph document {}", input.display()))?;
    Simulation::from_config(graph.clone(), &config, NullSink).context("invalid layout config")?;

    let anchored = graph.nodes().iter().filter(|n| n.is_anchored()).count();
    println!(
        "{}: {} nodes ({} anchored), {} links",
        input.display(),
        graph.len(),
        anchored,
        graph.links().len()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Simulate(args) => simulate(args),
        Commands::Check { input, config } => check(input, config.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_simulate_with_defaults() {
        let cli = Cli::try_parse_from([
            "geoforce",
            "simulate",
            "--input",
            "graph.json",
            "--center",
            "13.75,100.5",
            "--zoom",
            "6",
        ])
        .unwrap();
        assert!(!cli.verbose);
        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.input, PathBuf::from("graph.json"));
                assert_eq!(args.center, LatLng::new(13.75, 100.5));
                assert_eq!(args.zoom, 6.0);
                assert_eq!((args.width, args.height), (1024.0, 768.0));
                assert_eq!(args.max_ticks, 1000);
                assert!(args.views.is_empty());
                assert!(args.config.is_none());
            }
            _ => panic!("Expected Simulate command"),
        }
    }

    #[test]
    fn cli_parses_negative_coordinates_and_views() {
        let cli = Cli::try_parse_from([
            "geoforce",
            "simulate",
            "-i",
            "graph.json",
            "--center",
            "-33.87,151.21",
            "--zoom",
            "10",
            "--view",
            "-33.87,151.21,12",
            "--view",
            "-34.0,150.9,8.5",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.center, LatLng::new(-33.87, 151.21));
                assert_eq!(
                    args.views,
                    vec![
                        ViewChange {
                            center: LatLng::new(-33.87, 151.21),
                            zoom: 12.0
                        },
                        ViewChange {
                            center: LatLng::new(-34.0, 150.9),
                            zoom: 8.5
                        },
                    ]
                );
            }
            _ => panic!("Expected Simulate command"),
        }
    }

    #[test]
    fn cli_parses_check_subcommand() {
        let cli = Cli::try_parse_from(["geoforce", "check", "--input", "graph.json"]).unwrap();
        match cli.command {
            Commands::Check { input, config } => {
                assert_eq!(input, PathBuf::from("graph.json"));
                assert!(config.is_none());
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn cli_requires_center_and_zoom() {
        assert!(Cli::try_parse_from(["geoforce", "simulate", "-i", "g.json"]).is_err());
    }

    #[test]
    fn lat_lng_parser_rejects_garbage() {
        assert!(parse_lat_lng("13.75").is_err());
        assert!(parse_lat_lng("north,100").is_err());
        assert!(parse_lat_lng("NaN,100").is_err());
        assert_eq!(parse_lat_lng(" 1.5 , -2 "), Ok(LatLng::new(1.5, -2.0)));
    }

    #[test]
    fn view_parser_splits_zoom_from_the_right() {
        assert_eq!(
            parse_view("10,20,3"),
            Ok(ViewChange {
                center: LatLng::new(10.0, 20.0),
                zoom: 3.0
            })
        );
        assert!(parse_view("10,20").is_err());
    }
}
