//! Pulse Graph - command line driver
//!
//! Builds formations and fires pulses through them, printing statistics,
//! traces and slot views.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use pulse_graph::color::Rgb;
use pulse_graph::events::{DiagnosticSink, EventBus, FanoutSink, TracingSink};
use pulse_graph::graph::{NetworkGraph, NodeClass, Vec3};
use pulse_graph::propagation::{Clock, SystemClock};
use pulse_graph::session::{PulseSession, SlotView};
use pulse_graph::Config;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pulse-graph")]
#[command(about = "Spatial graph formations and pulse propagation")]
struct Cli {
    /// Path to a YAML config file (defaults to ./config.yaml)
    #[arg(short, long, env = "PULSE_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Formation selection shared by the graph-building commands.
#[derive(Args, Clone)]
struct FormationArgs {
    /// Formation id (wraps around the registry)
    #[arg(short, long)]
    formation: Option<usize>,

    /// Fraction of nodes kept, in (0, 1]
    #[arg(short, long)]
    density: Option<f64>,

    /// Generator seed for reproducible builds
    #[arg(short, long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered formations
    Formations,

    /// Build a formation and print graph statistics
    Build {
        #[command(flatten)]
        formation: FormationArgs,
    },

    /// Build a formation and fire one pulse
    Pulse {
        #[command(flatten)]
        formation: FormationArgs,

        /// Requested origin as "x,y,z"
        #[arg(long, default_value = "0,0,0")]
        at: String,

        /// Starting energy in (0, 1]
        #[arg(short, long, default_value = "1.0")]
        intensity: f64,

        /// Pulse color as a hex string
        #[arg(long, default_value = "#8b5cf6")]
        color: String,

        /// Print the full trace as JSON instead of the summary
        #[arg(long)]
        json_trace: bool,
    },

    /// Fire several pulses at random nodes and print the slot views
    Demo {
        #[command(flatten)]
        formation: FormationArgs,

        /// Number of pulses to fire
        #[arg(short, long, default_value = "5")]
        pulses: usize,
    },
}

fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,pulse_graph=debug".into());
    if cli.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = Config::from_yaml_and_env(cli.config.as_deref())?;

    match cli.command {
        Commands::Formations => run_formations(&config),
        Commands::Build { formation } => run_build(config, formation),
        Commands::Pulse {
            formation,
            at,
            intensity,
            color,
            json_trace,
        } => run_pulse(config, formation, &at, intensity, &color, json_trace),
        Commands::Demo { formation, pulses } => run_demo(config, formation, pulses),
    }
}

/// Apply command-line formation overrides on top of the loaded config.
fn apply_overrides(mut config: Config, args: &FormationArgs) -> Config {
    if let Some(id) = args.formation {
        config.formation.default_formation = id;
    }
    if let Some(density) = args.density {
        config.formation.density = density;
    }
    if args.seed.is_some() {
        config.formation.seed = args.seed;
    }
    config
}

/// Build a session and select the configured formation.
fn start_session(
    config: &Config,
    sink: Arc<dyn DiagnosticSink>,
) -> Result<(PulseSession, Arc<NetworkGraph>)> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let mut session = config.build_session(sink, clock)?;
    let graph = session
        .select_formation(config.formation.default_formation, config.formation.density)
        .context("Failed to build formation")?;
    Ok((session, graph))
}

fn parse_point(s: &str) -> Result<Vec3> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("Invalid point '{s}'"))?;
    match parts.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => bail!("Point '{s}' must have three components"),
    }
}

fn run_formations(config: &Config) -> Result<()> {
    let registry = pulse_graph::graph::FormationRegistry::from_config(&config.formation)?;
    for (id, name) in registry.names().iter().enumerate() {
        println!("{id}  {name}");
    }
    Ok(())
}

fn run_build(config: Config, args: FormationArgs) -> Result<()> {
    let config = apply_overrides(config, &args);
    let (_, graph) = start_session(&config, Arc::new(TracingSink))?;

    let mut classes: BTreeMap<String, usize> = BTreeMap::new();
    let mut levels: BTreeMap<u32, usize> = BTreeMap::new();
    for node in graph.nodes() {
        *classes.entry(node.class().to_string()).or_default() += 1;
        *levels.entry(node.level).or_default() += 1;
    }
    let root_degree = graph.root().map(|r| r.degree()).unwrap_or(0);

    println!("formation   {} (#{})", graph.formation, graph.formation_id);
    println!("density     {}", graph.density);
    println!("nodes       {}", graph.len());
    println!("edges       {}", graph.edge_count());
    println!("root degree {root_degree}");
    println!("reachable   {}", graph.reachable_from_root());
    for (class, count) in &classes {
        println!("  {class:<9} {count}");
    }
    for (level, count) in &levels {
        println!("  level {level}   {count}");
    }
    Ok(())
}

fn run_pulse(
    config: Config,
    args: FormationArgs,
    at: &str,
    intensity: f64,
    color: &str,
    json_trace: bool,
) -> Result<()> {
    let config = apply_overrides(config, &args);
    let origin = parse_point(at)?;
    let color = Rgb::from_hex(color).ok_or_else(|| anyhow!("Invalid color '{color}'"))?;

    let (mut session, graph) = start_session(&config, Arc::new(TracingSink))?;
    let trace = session.pulse_at(origin, color, intensity)?;

    if json_trace {
        println!("{}", serde_json::to_string_pretty(trace.as_ref())?);
        return Ok(());
    }

    let s = &trace.summary;
    let class = graph
        .node(trace.anchor)
        .map(|n| n.class())
        .unwrap_or(NodeClass::Interior);
    println!("formation        {}", trace.formation);
    println!(
        "anchor           #{} {} at {} (distance {:.3})",
        trace.anchor, class, trace.anchor_position, trace.anchor_distance
    );
    println!("steps            {} ({})", s.steps, s.termination);
    println!("nodes activated  {}", s.nodes_activated);
    println!("distance         {:.3} total, {:.3} max edge", s.total_distance, s.max_edge_distance);
    println!("reach            {:.3}", s.reach);
    println!("duration         {:.3} ms ({:.4} ms/hop)", s.duration_ms, s.avg_hop_latency_ms);
    println!("retained energy  {:.3}", s.retained_energy_fraction);
    println!("display color    {}", s.display_color);
    Ok(())
}

fn run_demo(config: Config, args: FormationArgs, pulses: usize) -> Result<()> {
    let config = apply_overrides(config, &args);
    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    let sink = FanoutSink::default()
        .with(Arc::new(TracingSink))
        .with(Arc::new(bus.clone()));

    let (mut session, graph) = start_session(&config, Arc::new(sink))?;
    let mut rng = match config.formation.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };

    for i in 0..pulses {
        let target = rng.gen_range(0..graph.len());
        let origin = graph.nodes()[target].position;
        let color = Rgb::PALETTE[i % Rgb::PALETTE.len()];
        let intensity = rng.gen_range(0.5..=1.0);
        let trace = session.pulse_at(origin, color, intensity)?;
        println!(
            "pulse {i}: anchor #{:<4} steps {:>3}  activated {:>3}  retained {:.3}",
            trace.anchor,
            trace.steps(),
            trace.nodes_activated(),
            trace.summary.retained_energy_fraction
        );
    }

    for (slot, view) in session.frame().iter().enumerate() {
        match view {
            SlotView::Inactive => println!("slot {slot}: inactive"),
            SlotView::Active {
                origin,
                color,
                radius,
                normalized_age,
                ..
            } => println!(
                "slot {slot}: {color} at {origin}, radius {radius:.3}, age {normalized_age:.3}"
            ),
        }
    }

    let mut kinds: BTreeMap<&'static str, usize> = BTreeMap::new();
    while let Ok(event) = rx.try_recv() {
        *kinds.entry(event.kind()).or_default() += 1;
    }
    for (kind, count) in kinds {
        println!("{kind:<18} {count}");
    }
    Ok(())
}
