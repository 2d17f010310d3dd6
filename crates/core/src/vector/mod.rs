//! Flood extent geometry

use crate::crs::CRS;
use geo_types::{Coord, LineString, MultiPolygon, Polygon};

/// Observed flood extent: one or more polygons (holes permitted) with the
/// CRS they are expressed in.
#[derive(Debug, Clone)]
pub struct FloodPolygon {
    /// Flood polygons
    pub polygons: MultiPolygon<f64>,
    /// CRS of the vertex coordinates, if known
    pub crs: Option<CRS>,
}

impl FloodPolygon {
    pub fn new(polygons: MultiPolygon<f64>, crs: Option<CRS>) -> Self {
        Self { polygons, crs }
    }

    /// Single polygon without CRS information
    pub fn from_polygon(polygon: Polygon<f64>) -> Self {
        Self::new(MultiPolygon::new(vec![polygon]), None)
    }

    /// Attach a CRS
    pub fn with_crs(mut self, crs: CRS) -> Self {
        self.crs = Some(crs);
        self
    }

    /// Number of polygons
    pub fn len(&self) -> usize {
        self.polygons.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Polygon<f64>> {
        self.polygons.0.iter()
    }

    /// Outline of each polygon as closed line strings (exterior first, then
    /// interiors), paired with the polygon's 0-based index.
    pub fn boundary_lines(&self) -> impl Iterator<Item = (usize, &LineString<f64>)> {
        self.iter().enumerate().flat_map(|(i, polygon)| {
            std::iter::once(polygon.exterior())
                .chain(polygon.interiors().iter())
                .map(move |ring| (i, ring))
        })
    }

    /// Bounding box (min_x, min_y, max_x, max_y), `None` when there are no vertices
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut coords = self
            .boundary_lines()
            .flat_map(|(_, ring)| ring.coords().copied());
        let Coord { x, y } = coords.next()?;
        Some(coords.fold((x, y, x, y), |(min_x, min_y, max_x, max_y), c| {
            (min_x.min(c.x), min_y.min(c.y), max_x.max(c.x), max_y.max(c.y))
        }))
    }
}
