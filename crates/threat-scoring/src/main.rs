//! Threat Assessment CLI
//!
//! Scores adversarial satellites against a protected constellation, or
//! computes the time of closest approach between two catalog objects.
//!
//! Usage:
//!   assess-threats assess --config threat_config.json --gp gp.json \
//!                         --satcat satcat.json --output threat_scores.json
//!   assess-threats tca --gp gp.json --primary 41994 --secondary 48274

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use collision_avoidance::find_tca_at;
use orbital_mechanics::{parse_records, propagation::sample_orbit};
use std::path::PathBuf;
use threat_scoring::{DataSource, JsonFileSource, ThreatConfig, ThreatPipeline};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "assess-threats",
    about = "Bayesian proximity threat assessment for a protected constellation"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score every adversarial satellite in the element data
    Assess(AssessArgs),
    /// Closest approach between two catalog objects
    Tca(TcaArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// GP element records (JSON array)
    #[arg(short = 'g', long)]
    gp: PathBuf,

    /// SATCAT records for RCS enrichment (JSON array)
    #[arg(short = 's', long)]
    satcat: Option<PathBuf>,

    /// Window start (RFC 3339); defaults to now
    #[arg(long)]
    start: Option<DateTime<Utc>>,
}

impl SourceArgs {
    fn source(&self) -> JsonFileSource {
        let source = JsonFileSource::new(&self.gp);
        match &self.satcat {
            Some(path) => source.with_satcat(path),
            None => source,
        }
    }

    fn start(&self) -> DateTime<Utc> {
        self.start.unwrap_or_else(Utc::now)
    }
}

#[derive(Args, Debug)]
struct AssessArgs {
    /// Assessment configuration (JSON)
    #[arg(short, long, default_value = "threat_config.json")]
    config: PathBuf,

    #[command(flatten)]
    source: SourceArgs,

    /// Output JSON file
    #[arg(short, long, default_value = "threat_scores.json")]
    output: PathBuf,

    /// Rows in the ranked summary
    #[arg(long, default_value_t = 20)]
    top: usize,
}

#[derive(Args, Debug)]
struct TcaArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Primary catalog id
    #[arg(long)]
    primary: u64,

    /// Secondary catalog id
    #[arg(long)]
    secondary: u64,

    /// Samples per orbit for each track
    #[arg(long, default_value_t = 360)]
    points: usize,

    /// Output JSON file; printed to stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Command::Assess(args) => assess(args),
        Command::Tca(args) => tca(args),
    }
}

fn assess(args: AssessArgs) -> Result<()> {
    info!("{}", "=".repeat(60));
    info!("Satellite Threat Assessment");
    info!("{}", "=".repeat(60));

    let config = ThreatConfig::load(&args.config)
        .with_context(|| format!("loading configuration {:?}", args.config))?;
    let pipeline = ThreatPipeline::new(config)?;

    let assessment = pipeline.run(&args.source.source(), args.source.start())?;

    assessment.write_json(&args.output)?;
    assessment.log_summary(args.top);
    Ok(())
}

fn tca(args: TcaArgs) -> Result<()> {
    let source = args.source.source();
    let records = source.element_records()?;
    let catalog = parse_records(&records, &source.rcs_lookup()?);

    let find = |id: u64| {
        catalog
            .elements
            .iter()
            .find(|e| e.catalog_id() == id)
            .ok_or_else(|| anyhow!("catalog id {} not found in element data", id))
    };
    let primary = find(args.primary)?;
    let secondary = find(args.secondary)?;

    let now = args.source.start();
    let track_a = sample_orbit(primary, now, args.points)?;
    let track_b = sample_orbit(secondary, now, args.points)?;

    let result = find_tca_at(&track_a, &track_b, now)?;
    info!(
        "{} vs {}: miss {:.3} km at {} (relative velocity {:.3} km/s)",
        result.primary_id,
        result.secondary_id,
        result.miss_distance_km,
        result.tca,
        result.relative_velocity_km_s
    );

    let json = serde_json::to_string_pretty(&result)?;
    match args.output {
        Some(path) => std::fs::write(&path, json).with_context(|| format!("writing {:?}", path))?,
        None => println!("{}", json),
    }
    Ok(())
}
