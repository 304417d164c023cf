//! Solarsite CLI - rooftop PV yield estimation from irradiance rasters

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use solarsite_algorithms::pv::ProfileCatalog;
use solarsite_algorithms::statistics::zonal_statistics_from_path;
use solarsite_algorithms::{estimate_site, SiteRequest};
use solarsite_core::raster::RasterSource;
use solarsite_core::RasterHandle;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "solarsite")]
#[command(author, version, about = "Rooftop photovoltaic yield estimation", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show georeferencing, nodata and units of a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Zonal statistics of one raster inside a polygon
    Zonal {
        /// Input raster file
        input: PathBuf,
        /// Polygon as a JSON array of [lon, lat] pairs, or a file containing one
        #[arg(short, long)]
        polygon: String,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Estimate PV energy for a site request (JSON)
    Estimate {
        /// Request file
        request: PathBuf,
        /// Technology / grid profile catalog (JSON) replacing the built-in tables
        #[arg(long)]
        profiles: Option<PathBuf>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} {}", what, path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid {} in {}", what, path.display()))
}

fn parse_polygon(arg: &str) -> Result<Vec<[f64; 2]>> {
    if arg.trim_start().starts_with('[') {
        serde_json::from_str(arg).context("Invalid polygon JSON")
    } else {
        read_json(Path::new(arg), "polygon")
    }
}

fn load_catalog(path: Option<&Path>) -> Result<ProfileCatalog> {
    let catalog = match path {
        Some(p) => read_json(p, "profile catalog")?,
        None => ProfileCatalog::default(),
    };
    catalog.validate().context("Invalid profile catalog")?;
    Ok(catalog)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => {
            let pb = spinner("Reading raster...");
            let handle = RasterHandle::open(&input).context("Failed to open raster")?;
            pb.finish_and_clear();

            let extent = handle.extent();
            let (px, py) = extent.pixel_size();
            println!("File: {}", input.display());
            println!(
                "Dimensions: {} x {} ({} cells)",
                extent.width,
                extent.height,
                extent.width * extent.height
            );
            println!("Cell size: {:.6} x {:.6}", px, py);
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                extent.min_x, extent.min_y, extent.max_x, extent.max_y
            );
            if let Some(nodata) = handle.nodata() {
                println!("NoData: {}", nodata);
            }
            if let Some(units) = handle.units() {
                println!("Units: {}", units);
            }
        }

        Commands::Zonal { input, polygon, pretty } => {
            let ring = parse_polygon(&polygon)?;
            let start = Instant::now();
            let pb = spinner("Sampling raster...");
            let stats = zonal_statistics_from_path(&input, &ring);
            pb.finish_and_clear();
            let stats = stats
                .with_context(|| format!("Zonal statistics failed for {}", input.display()))?;

            info!("{} samples (stride {}) in {:.2?}", stats.count, stats.stride, start.elapsed());
            print_json(&stats, pretty)?;
        }

        Commands::Estimate { request, profiles, pretty } => {
            let catalog = load_catalog(profiles.as_deref())?;
            let req: SiteRequest = read_json(&request, "site request")?;

            let start = Instant::now();
            let pb = spinner(&format!("Sampling {} layers...", req.layers.len()));
            let estimate = estimate_site(&req, &catalog);
            pb.finish_and_clear();
            let estimate = estimate.context("Site estimation failed")?;

            for w in &estimate.energy.warnings {
                warn!("{}", w);
            }
            info!(
                "{:.1} kWp, {:.0} kWh/yr usable in {:.2?}",
                estimate.energy.dc_capacity_kw,
                estimate.energy.usable_annual_energy_kwh,
                start.elapsed()
            );
            print_json(&estimate, pretty)?;
        }
    }

    Ok(())
}
