//! End-to-end floodwater depth estimation
//!
//! ```text
//! polygon ─► rasterize ─► boundary ─► grow ─► composite ─► low-pass
//!               │                              ▲
//!               └────────── footprint ─────────┘
//! ```
//!
//! All inputs are checked before any raster work: parameters, CRS
//! agreement, polygon validity and cost-surface alignment. Conditions the
//! run can survive are collected as [`FloodWarning`]s.

use std::fmt;

use crate::flood::boundary::{extract_boundary, BoundaryExtraction, BoundaryParams};
use crate::flood::depth::composite_depth;
use crate::flood::grow::{default_cost_surface, nearest_label_propagation, DistanceMetric};
use crate::flood::lowpass::{low_pass, LowPassParams};
use crate::vector::{fill_footprint, trace_boundary, validate_flood_polygon};
use fwdet_core::raster::Raster;
use fwdet_core::{Algorithm, Error, FloodPolygon, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Parameters for [`flood_depth`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FloodDepthParams {
    /// Boundary smoothing passes (default 10)
    pub num_iterations: usize,
    /// Percent slope above which boundary cells are dropped (0 = off)
    pub slope_threshold: f64,
    /// Side of the square smoothing window in cells (default 5)
    pub smoothing_window: usize,
    /// Remove boundary cells near elevation ≤ 0 (default on)
    pub ocean_filter: bool,
    /// Radius in cells of the ocean-filter window (default 2)
    pub ocean_filter_radius: usize,
    pub distance_metric: DistanceMetric,
    /// Cost of DEM cells ≤ 0 in the default cost surface (default 1000)
    pub water_cost: f64,
    /// Decimal places kept on boundary elevations (default 4)
    pub boundary_precision: Option<u32>,
    pub low_pass: LowPassParams,
    /// Cost surface for [`DistanceMetric::CostWeighted`]; derived from the
    /// DEM when absent. Must be aligned with the DEM.
    #[serde(skip)]
    pub cost_surface: Option<Raster<f64>>,
}

impl Default for FloodDepthParams {
    fn default() -> Self {
        let boundary = BoundaryParams::default();
        Self {
            num_iterations: boundary.num_iterations,
            slope_threshold: boundary.slope_threshold,
            smoothing_window: boundary.smoothing_window,
            ocean_filter: boundary.ocean_filter,
            ocean_filter_radius: boundary.ocean_filter_radius,
            distance_metric: DistanceMetric::default(),
            water_cost: 1000.0,
            boundary_precision: boundary.precision,
            low_pass: LowPassParams::default(),
            cost_surface: None,
        }
    }
}

impl FloodDepthParams {
    /// Boundary-extraction subset of these parameters
    pub fn boundary_params(&self) -> BoundaryParams {
        BoundaryParams {
            num_iterations: self.num_iterations,
            smoothing_window: self.smoothing_window,
            ocean_filter: self.ocean_filter,
            ocean_filter_radius: self.ocean_filter_radius,
            slope_threshold: self.slope_threshold,
            precision: self.boundary_precision,
        }
    }

    /// Reject illegal parameter values
    pub fn validate(&self) -> Result<()> {
        self.boundary_params().validate()?;
        self.low_pass.validate()?;
        if !(self.water_cost > 0.0 && self.water_cost.is_finite()) {
            return Err(Error::invalid_parameter(
                "water_cost",
                self.water_cost,
                "must be a positive finite number",
            ));
        }
        Ok(())
    }
}

/// Pipeline stage, reported to progress observers as it starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Rasterize,
    ExtractBoundary,
    Grow,
    Composite,
    LowPass,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Rasterize,
        Stage::ExtractBoundary,
        Stage::Grow,
        Stage::Composite,
        Stage::LowPass,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Rasterize => "rasterizing flood polygon",
            Stage::ExtractBoundary => "extracting boundary elevations",
            Stage::Grow => "growing boundary elevations",
            Stage::Composite => "compositing depth",
            Stage::LowPass => "low-pass filtering depth",
        };
        f.write_str(name)
    }
}

/// Non-fatal conditions found during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FloodWarning {
    /// No boundary cell survived filtering; depth rasters are all nodata
    EmptyBoundary,
    /// Grid is in geographic coordinates but the metric is planar
    GeographicCrs,
    /// The polygon extends beyond the DEM; outside parts are ignored
    PolygonOutsideDem,
}

impl fmt::Display for FloodWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FloodWarning::EmptyBoundary => {
                write!(f, "no boundary cells survived filtering; depth is undefined everywhere")
            }
            FloodWarning::GeographicCrs => write!(
                f,
                "DEM is in a geographic CRS; distances are measured in degrees \
                 (consider a projected CRS or the geodesic metric)"
            ),
            FloodWarning::PolygonOutsideDem => {
                write!(f, "flood polygon extends beyond the DEM extent")
            }
        }
    }
}

/// Everything a run produces, aligned to the DEM grid
#[derive(Debug, Clone)]
pub struct FloodDepthOutput {
    /// Line raster (1-based polygon index, 0 = nodata)
    pub line: Raster<u32>,
    /// Footprint raster (1 inside, 0 = nodata)
    pub footprint: Raster<u8>,
    pub boundary: BoundaryExtraction,
    /// Boundary elevation grown over the whole grid
    pub grown: Raster<f64>,
    /// Distance (or accumulated cost) to the boundary cell each value came from
    pub distance: Raster<f64>,
    /// Raw depth inside the footprint
    pub depth: Raster<f64>,
    /// Low-pass filtered depth
    pub depth_filtered: Raster<f64>,
    pub warnings: Vec<FloodWarning>,
}

/// Estimate floodwater depth from a DEM and a flood extent polygon.
///
/// # Arguments
/// * `dem` - Elevation (or HAND) raster; its nodata value is honoured
/// * `flood` - Observed flood extent
/// * `params` - Pipeline parameters
///
/// # Errors
/// Configuration, geometry and alignment errors, all raised before any
/// raster is computed. An empty boundary is a warning, not an error.
pub fn flood_depth(
    dem: &Raster<f64>,
    flood: &FloodPolygon,
    params: &FloodDepthParams,
) -> Result<FloodDepthOutput> {
    flood_depth_with_progress(dem, flood, params, |_| {})
}

/// [`flood_depth`] reporting each [`Stage`] to `observer` as it starts
pub fn flood_depth_with_progress<F>(
    dem: &Raster<f64>,
    flood: &FloodPolygon,
    params: &FloodDepthParams,
    mut observer: F,
) -> Result<FloodDepthOutput>
where
    F: FnMut(Stage),
{
    // Inputs
    params.validate()?;

    let mut dem = dem.nodata_as_nan();
    match (dem.crs(), &flood.crs) {
        (Some(a), Some(b)) if !a.is_equivalent(b) => {
            return Err(Error::CrsMismatch(a.identifier(), b.identifier()));
        }
        (None, Some(b)) => dem.set_crs(Some(b.clone())),
        _ => {}
    }
    validate_flood_polygon(flood)?;

    let metric = params.distance_metric;
    let geographic = dem.crs().is_some_and(|crs| crs.is_geographic());
    if metric == DistanceMetric::Geodesic && !geographic {
        return Err(Error::invalid_parameter(
            "distance_metric",
            "geodesic",
            "requires a DEM in a geographic CRS",
        ));
    }

    let cost = match metric {
        DistanceMetric::CostWeighted => match &params.cost_surface {
            Some(cost) => {
                dem.ensure_aligned(cost)?;
                Some(cost.nodata_as_nan())
            }
            None => Some(default_cost_surface(&dem, params.water_cost)?),
        },
        _ => None,
    };

    let mut warnings = Vec::new();
    if geographic && metric != DistanceMetric::Geodesic {
        warnings.push(FloodWarning::GeographicCrs);
    }
    if let Some((min_x, min_y, max_x, max_y)) = flood.bounds() {
        let (dem_min_x, dem_min_y, dem_max_x, dem_max_y) = dem.bounds();
        if min_x < dem_min_x || min_y < dem_min_y || max_x > dem_max_x || max_y > dem_max_y {
            warnings.push(FloodWarning::PolygonOutsideDem);
        }
    }

    let (rows, cols) = dem.shape();
    info!(rows, cols, polygons = flood.len(), ?metric, "estimating flood depth");

    // Stage 1
    observer(Stage::Rasterize);
    info!(stage = %Stage::Rasterize);
    let grid = dem.grid_spec();
    let line = trace_boundary(flood, &grid)?;
    let footprint = fill_footprint(flood, &grid)?;
    debug!(footprint_cells = footprint.valid_count(), "footprint rasterized");

    // Stage 2
    observer(Stage::ExtractBoundary);
    info!(stage = %Stage::ExtractBoundary);
    let boundary = extract_boundary(&dem, &line, &params.boundary_params())?;
    if boundary.counts.after_slope == 0 {
        warnings.push(FloodWarning::EmptyBoundary);
    }

    // Stage 3
    observer(Stage::Grow);
    info!(stage = %Stage::Grow);
    let allocation = nearest_label_propagation(&boundary.boundary, metric, cost.as_ref())?;

    // Stage 4
    observer(Stage::Composite);
    info!(stage = %Stage::Composite);
    let depth = composite_depth(&allocation.labels, &dem, &footprint)?;

    // Stage 5
    observer(Stage::LowPass);
    info!(stage = %Stage::LowPass);
    let depth_filtered = low_pass(&depth, &params.low_pass)?;

    for warning in &warnings {
        warn!("{}", warning);
    }

    Ok(FloodDepthOutput {
        line,
        footprint,
        boundary,
        grown: allocation.labels,
        distance: allocation.distance,
        depth,
        depth_filtered,
        warnings,
    })
}

/// Floodwater depth estimation as an [`Algorithm`]
#[derive(Debug, Clone, Default)]
pub struct FloodDepth;

impl Algorithm for FloodDepth {
    type Input = (Raster<f64>, FloodPolygon);
    type Output = FloodDepthOutput;
    type Params = FloodDepthParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "FloodDepth"
    }

    fn description(&self) -> &'static str {
        "Estimate floodwater depth from a DEM and an observed flood extent polygon"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (dem, flood) = input;
        flood_depth(&dem, &flood, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fwdet_core::{ErrorKind, GeoTransform, CRS};
    use geo::polygon;

    fn flat_dem(value: f64) -> Raster<f64> {
        let mut dem = Raster::filled(10, 10, value);
        dem.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));
        dem
    }

    fn inner_square() -> FloodPolygon {
        FloodPolygon::from_polygon(polygon![
            (x: 0.6, y: 0.6),
            (x: 9.4, y: 0.6),
            (x: 9.4, y: 9.4),
            (x: 0.6, y: 9.4),
        ])
    }

    #[test]
    fn test_default_params() {
        let p = FloodDepthParams::default();
        assert_eq!(p.num_iterations, 10);
        assert_eq!(p.smoothing_window, 5);
        assert!(p.ocean_filter);
        assert_eq!(p.ocean_filter_radius, 2);
        assert_eq!(p.slope_threshold, 0.0);
        assert_eq!(p.distance_metric, DistanceMetric::Euclidean);
        assert_eq!(p.boundary_precision, Some(4));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_params_from_partial_json() {
        let p: FloodDepthParams = serde_json::from_str(
            r#"{"num_iterations": 3, "distance_metric": "cost_weighted", "low_pass": {"radius": 1}}"#,
        )
        .unwrap();
        assert_eq!(p.num_iterations, 3);
        assert_eq!(p.distance_metric, DistanceMetric::CostWeighted);
        assert_eq!(p.low_pass.radius, 1);
        assert_eq!(p.smoothing_window, 5);
    }

    #[test]
    fn test_stages_reported_in_order() {
        let mut seen = Vec::new();
        flood_depth_with_progress(&flat_dem(5.0), &inner_square(), &FloodDepthParams::default(), |s| {
            seen.push(s)
        })
        .unwrap();
        assert_eq!(seen, Stage::ALL.to_vec());
    }

    #[test]
    fn test_crs_mismatch_is_geometry_error() {
        let mut dem = flat_dem(5.0);
        dem.set_crs(Some(CRS::from_epsg(32630)));
        let flood = inner_square().with_crs(CRS::from_epsg(32631));
        let err = flood_depth(&dem, &flood, &FloodDepthParams::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Geometry);
    }

    #[test]
    fn test_invalid_params_rejected_first() {
        let params = FloodDepthParams { smoothing_window: 2, ..FloodDepthParams::default() };
        let err = flood_depth(&flat_dem(5.0), &inner_square(), &params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let params = FloodDepthParams { water_cost: -1.0, ..FloodDepthParams::default() };
        let err = flood_depth(&flat_dem(5.0), &inner_square(), &params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_misaligned_cost_surface() {
        let params = FloodDepthParams {
            distance_metric: DistanceMetric::CostWeighted,
            cost_surface: Some(Raster::filled(5, 5, 1.0)),
            ..FloodDepthParams::default()
        };
        let err = flood_depth(&flat_dem(5.0), &inner_square(), &params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Alignment);
    }

    #[test]
    fn test_geodesic_needs_geographic_dem() {
        let params = FloodDepthParams {
            distance_metric: DistanceMetric::Geodesic,
            ..FloodDepthParams::default()
        };
        let err = flood_depth(&flat_dem(5.0), &inner_square(), &params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_warnings() {
        let mut dem = flat_dem(5.0);
        dem.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));
        dem.set_crs(Some(CRS::wgs84()));
        let flood = FloodPolygon::from_polygon(polygon![
            (x: 0.6, y: 0.6),
            (x: 12.0, y: 0.6),
            (x: 12.0, y: 9.4),
            (x: 0.6, y: 9.4),
        ]);
        let out = flood_depth(&dem, &flood, &FloodDepthParams::default()).unwrap();
        assert!(out.warnings.contains(&FloodWarning::GeographicCrs));
        assert!(out.warnings.contains(&FloodWarning::PolygonOutsideDem));
        assert!(!out.warnings.contains(&FloodWarning::EmptyBoundary));
    }

    #[test]
    fn test_empty_boundary_is_warning() {
        // Everything at sea level: the ocean filter removes every boundary cell
        let out = flood_depth(&flat_dem(0.0), &inner_square(), &FloodDepthParams::default()).unwrap();
        assert_eq!(out.warnings, vec![FloodWarning::EmptyBoundary]);
        assert_eq!(out.depth.valid_count(), 0);
        assert_eq!(out.depth_filtered.valid_count(), 0);
        assert_eq!(out.footprint.valid_count(), 64);
    }

    #[test]
    fn test_algorithm_trait() {
        let algo = FloodDepth;
        assert_eq!(algo.name(), "FloodDepth");
        let out = algo.execute_default((flat_dem(5.0), inner_square())).unwrap();
        assert_eq!(out.depth.valid_count(), 64);
    }

    #[test]
    fn test_polygon_crs_adopted_by_outputs() {
        let flood = inner_square().with_crs(CRS::from_epsg(32630));
        let out = flood_depth(&flat_dem(5.0), &flood, &FloodDepthParams::default()).unwrap();
        assert_eq!(out.depth.crs().and_then(|c| c.epsg()), Some(32630));
    }
}
