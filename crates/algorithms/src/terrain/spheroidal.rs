//! Spheroidal helpers for DEMs in geographic (lon/lat) coordinates
//!
//! Cell dimensions vary with latitude: dx = N·cos(φ)·Δλ, dy = M·Δφ, with N
//! and M the prime-vertical and meridional radii of curvature.
//! Point-to-point distances use the haversine formula on a sphere of the
//! WGS84 mean radius.

/// WGS84 ellipsoid parameters
const WGS84_A: f64 = 6_378_137.0; // semi-major axis (m)
const WGS84_F: f64 = 1.0 / 298.257_223_563; // flattening

/// Mean earth radius of the WGS84 ellipsoid, (2a + b) / 3, in meters
pub const WGS84_MEAN_RADIUS: f64 = 6_371_008.771_4;

/// Parameters for spheroidal grid computations
#[derive(Debug, Clone)]
pub struct SpheroidalParams {
    /// Semi-major axis in meters. Default: WGS84 (6378137.0)
    pub semi_major: f64,
    /// Flattening. Default: WGS84 (1/298.257223563)
    pub flattening: f64,
}

impl Default for SpheroidalParams {
    fn default() -> Self {
        Self {
            semi_major: WGS84_A,
            flattening: WGS84_F,
        }
    }
}

/// Grid cell dimensions at a given latitude on the spheroid
#[derive(Debug, Clone, Copy)]
pub struct CellDimensions {
    /// East-West cell size in meters
    pub dx: f64,
    /// North-South cell size in meters
    pub dy: f64,
}

/// Compute cell dimensions at given latitude for a geographic grid.
///
/// # Arguments
/// * `latitude_deg` - Latitude in degrees
/// * `d_lon` - Grid spacing in longitude (degrees)
/// * `d_lat` - Grid spacing in latitude (degrees)
/// * `params` - Spheroid parameters
pub fn cell_dimensions(
    latitude_deg: f64,
    d_lon: f64,
    d_lat: f64,
    params: &SpheroidalParams,
) -> CellDimensions {
    let lat = latitude_deg.to_radians();
    let a = params.semi_major;
    let f = params.flattening;
    let e2 = 2.0 * f - f * f; // first eccentricity squared

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let w2 = 1.0 - e2 * sin_lat * sin_lat;

    // Radius of curvature in the prime vertical (N)
    let n = a / w2.sqrt();

    // Radius of curvature in the meridional plane (M)
    let m = a * (1.0 - e2) / w2.powf(1.5);

    CellDimensions {
        dx: (n * cos_lat * d_lon.to_radians()).abs(),
        dy: (m * d_lat.to_radians()).abs(),
    }
}

/// Great-circle distance in meters between two lon/lat points in degrees.
pub fn haversine_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = phi2 - phi1;
    let d_lambda = (lon2 - lon1).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * WGS84_MEAN_RADIUS * h.sqrt().min(1.0).asin()
}
