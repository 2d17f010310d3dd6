//! FwDET CLI - floodwater depth estimation from a DEM and a flood polygon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use fwdet_algorithms::flood::{
    flood_depth_with_progress, DistanceMetric, FloodDepthParams, LowPassKernel,
};
use fwdet_core::io::{read_flood_polygon, read_geotiff, write_geotiff, GeoTiffOptions};
use fwdet_core::{Raster, RasterElement, CRS};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "fwdet")]
#[command(author, version, about = "Floodwater depth estimation from a DEM and a flood extent", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate floodwater depth
    Estimate(EstimateArgs),
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MetricArg {
    Euclidean,
    Geodesic,
    CostWeighted,
}

impl From<MetricArg> for DistanceMetric {
    fn from(m: MetricArg) -> Self {
        match m {
            MetricArg::Euclidean => DistanceMetric::Euclidean,
            MetricArg::Geodesic => DistanceMetric::Geodesic,
            MetricArg::CostWeighted => DistanceMetric::CostWeighted,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KernelArg {
    Mean,
    Gaussian,
}

#[derive(clap::Args)]
struct EstimateArgs {
    /// Input DEM (or HAND) GeoTIFF
    dem: PathBuf,
    /// Flood extent polygon (GeoJSON)
    flood: PathBuf,
    /// Output raw depth GeoTIFF
    output: PathBuf,
    /// Also write the low-pass filtered depth here
    #[arg(long)]
    filtered: Option<PathBuf>,
    /// Also write the filtered boundary elevations here
    #[arg(long)]
    boundary: Option<PathBuf>,
    /// JSON parameter file; command-line flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Boundary smoothing passes
    #[arg(short, long)]
    iterations: Option<usize>,
    /// Drop boundary cells steeper than this percent slope (0 = off)
    #[arg(short, long)]
    slope_threshold: Option<f64>,
    /// Smoothing window side in cells (odd)
    #[arg(short, long)]
    window: Option<usize>,
    /// Ocean-filter radius in cells
    #[arg(long)]
    ocean_radius: Option<usize>,
    /// Keep boundary cells next to elevation <= 0
    #[arg(long)]
    no_ocean_filter: bool,
    /// Distance metric used to grow boundary elevations
    #[arg(short, long, value_enum)]
    metric: Option<MetricArg>,
    /// Cost surface GeoTIFF for the cost-weighted metric
    #[arg(long)]
    cost: Option<PathBuf>,
    /// Cost of DEM cells <= 0 in the default cost surface
    #[arg(long)]
    water_cost: Option<f64>,
    /// Decimal places kept on boundary elevations (negative = no rounding)
    #[arg(long, allow_negative_numbers = true)]
    precision: Option<i32>,
    /// Low-pass window half-width in cells (0 = off)
    #[arg(long)]
    lowpass_radius: Option<usize>,
    /// Low-pass kernel
    #[arg(short, long, value_enum)]
    kernel: Option<KernelArg>,
    /// Gaussian kernel sigma in cells
    #[arg(long)]
    sigma: Option<f64>,
    /// CRS of the DEM (e.g. EPSG:32630); also used for a polygon without one
    #[arg(long)]
    crs: Option<String>,
    /// Nodata value written to output rasters (default NaN)
    #[arg(long, allow_negative_numbers = true)]
    nodata: Option<f64>,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
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

fn read_raster(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn write_result<T: RasterElement>(raster: &Raster<T>, path: &Path, nodata: Option<f64>) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path, Some(GeoTiffOptions { nodata }))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path) {
    println!("{} saved to: {}", name, path.display());
}

/// Parameters from the config file (if any) with flag overrides applied
fn build_params(args: &EstimateArgs) -> Result<FloodDepthParams> {
    let mut params = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid parameter file {}", path.display()))?
        }
        None => FloodDepthParams::default(),
    };

    if let Some(n) = args.iterations {
        params.num_iterations = n;
    }
    if let Some(p) = args.slope_threshold {
        params.slope_threshold = p;
    }
    if let Some(w) = args.window {
        params.smoothing_window = w;
    }
    if let Some(r) = args.ocean_radius {
        params.ocean_filter_radius = r;
    }
    if args.no_ocean_filter {
        params.ocean_filter = false;
    }
    if let Some(m) = args.metric {
        params.distance_metric = m.into();
    }
    if let Some(c) = args.water_cost {
        params.water_cost = c;
    }
    if let Some(p) = args.precision {
        params.boundary_precision = u32::try_from(p).ok();
    }
    if let Some(r) = args.lowpass_radius {
        params.low_pass.radius = r;
    }
    match (args.kernel, args.sigma) {
        (Some(KernelArg::Mean), _) => params.low_pass.kernel = LowPassKernel::Mean,
        (Some(KernelArg::Gaussian), sigma) => {
            params.low_pass.kernel = LowPassKernel::Gaussian { sigma: sigma.unwrap_or(1.0) }
        }
        (None, Some(sigma)) => params.low_pass.kernel = LowPassKernel::Gaussian { sigma },
        (None, None) => {}
    }

    Ok(params)
}

fn estimate(args: EstimateArgs) -> Result<()> {
    let mut params = build_params(&args)?;
    debug!(?params, "parameters");

    let mut dem = read_raster(&args.dem)?;
    let mut flood = read_flood_polygon(&args.flood)
        .with_context(|| format!("Failed to read flood polygon {}", args.flood.display()))?;
    info!("Flood extent: {} polygon(s)", flood.len());

    if let Some(text) = &args.crs {
        let crs = CRS::parse(text);
        dem.set_crs(Some(crs.clone()));
        if flood.crs.is_none() {
            flood.crs = Some(crs);
        }
    }

    if let Some(path) = &args.cost {
        let mut cost = read_raster(path)?;
        cost.set_crs(dem.crs().cloned());
        params.cost_surface = Some(cost);
    }

    let start = Instant::now();
    let pb = spinner("Estimating flood depth...");
    let result = flood_depth_with_progress(&dem, &flood, &params, |stage| {
        pb.set_message(format!("{}...", stage));
    });
    pb.finish_and_clear();
    let output = result.context("Flood depth estimation failed")?;
    let elapsed = start.elapsed();

    let counts = output.boundary.counts;
    println!(
        "Boundary cells: {} on outline, {} sampled, {} after ocean filter, {} after slope filter",
        counts.line, counts.sampled, counts.after_ocean, counts.after_slope
    );
    let stats = output.depth.statistics();
    if let (Some(max), Some(mean)) = (stats.max, stats.mean) {
        println!("Depth: max {:.3}, mean {:.3} over {} cells", max, mean, stats.valid_count);
    }
    for warning in &output.warnings {
        eprintln!("warning: {}", warning);
    }

    write_result(&output.depth, &args.output, args.nodata)?;
    done("Depth", &args.output);
    if let Some(path) = &args.filtered {
        write_result(&output.depth_filtered, path, args.nodata)?;
        done("Filtered depth", path);
    }
    if let Some(path) = &args.boundary {
        write_result(&output.boundary.boundary, path, args.nodata)?;
        done("Boundary", path);
    }
    println!("  Processing time: {:.2?}", elapsed);

    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Estimate(args) => estimate(args)?,

        Commands::Info { input } => {
            let raster = read_raster(&input)?.nodata_as_nan();
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }
    }

    Ok(())
}
