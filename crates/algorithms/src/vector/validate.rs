//! Flood polygon validity checks
//!
//! Invalid geometry is reported, never repaired. A polygon is rejected when
//! a ring has fewer than 4 coordinates, a non-finite coordinate or zero
//! area; when rings self-intersect or cross each other; or when a hole
//! lies outside its exterior. Rings may touch each other at single points.

use fwdet_core::{Error, FloodPolygon, Result};
use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{Area, Coord, Intersects, Line, LineString, Polygon, RemoveRepeatedPoints};

/// Check every polygon of `flood`; the first defect found is returned as
/// [`Error::InvalidGeometry`].
pub fn validate_flood_polygon(flood: &FloodPolygon) -> Result<()> {
    if flood.is_empty() {
        return Err(Error::InvalidGeometry("flood extent has no polygons".into()));
    }

    for (idx, polygon) in flood.iter().enumerate() {
        validate_polygon(polygon).map_err(|reason| {
            Error::InvalidGeometry(format!("polygon {}: {}", idx, reason))
        })?;
    }

    Ok(())
}

fn validate_polygon(polygon: &Polygon<f64>) -> std::result::Result<(), String> {
    let rings: Vec<&LineString<f64>> = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .collect();

    for (ring_idx, ring) in rings.iter().enumerate() {
        let name = ring_name(ring_idx);
        let n = ring.0.len();
        if n < 4 {
            return Err(format!("{name} has {n} coordinates, at least 4 required"));
        }
        if ring.coords().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(format!("{name} has a non-finite coordinate"));
        }
        if !ring.is_closed() {
            return Err(format!("{name} is not closed"));
        }
        if Polygon::new((*ring).clone(), vec![]).unsigned_area() == 0.0 {
            return Err(format!("{name} has zero area"));
        }
    }

    check_intersections(&rings)?;

    let exterior = Polygon::new(polygon.exterior().clone(), vec![]);
    for (hole_idx, hole) in polygon.interiors().iter().enumerate() {
        if hole.coords().any(|c| !exterior.intersects(c)) {
            return Err(format!("{} lies outside the exterior", ring_name(hole_idx + 1)));
        }
    }

    Ok(())
}

fn ring_name(ring_idx: usize) -> String {
    match ring_idx {
        0 => "exterior ring".to_string(),
        i => format!("hole {}", i - 1),
    }
}

/// One ring edge, tagged with its ring and position
struct Edge {
    ring: usize,
    index: usize,
    ring_len: usize,
    line: Line<f64>,
    min_x: f64,
    max_x: f64,
}

impl Edge {
    fn adjacent(&self, other: &Edge) -> bool {
        self.ring == other.ring
            && (self.index.abs_diff(other.index) == 1
                || self.index.abs_diff(other.index) == self.ring_len - 1)
    }

    fn shares_endpoint(&self, other: &Edge, point: Coord<f64>) -> bool {
        let ends = |l: &Line<f64>| l.start == point || l.end == point;
        ends(&self.line) && ends(&other.line)
    }
}

/// Sweep over edges sorted by their minimum x, testing every pair whose
/// x-ranges overlap. Repeated consecutive vertices are collapsed first so
/// edge adjacency is judged on the distinct vertices.
fn check_intersections(rings: &[&LineString<f64>]) -> std::result::Result<(), String> {
    let rings: Vec<LineString<f64>> = rings.iter().map(|ls| ls.remove_repeated_points()).collect();
    let mut edges: Vec<Edge> = rings
        .iter()
        .enumerate()
        .flat_map(|(ring, ls)| {
            let ring_len = ls.0.len().saturating_sub(1);
            ls.lines().enumerate().map(move |(index, line)| Edge {
                ring,
                index,
                ring_len,
                line,
                min_x: line.start.x.min(line.end.x),
                max_x: line.start.x.max(line.end.x),
            })
        })
        .collect();
    edges.sort_by(|a, b| a.min_x.total_cmp(&b.min_x));

    for (i, a) in edges.iter().enumerate() {
        for b in edges[i + 1..].iter().take_while(|b| b.min_x <= a.max_x) {
            let Some(hit) = line_intersection(a.line, b.line) else {
                continue;
            };

            let allowed = match hit {
                LineIntersection::SinglePoint { intersection, is_proper } => {
                    if a.ring == b.ring {
                        a.adjacent(b) && a.shares_endpoint(b, intersection)
                    } else {
                        !is_proper
                    }
                }
                LineIntersection::Collinear { .. } => false,
            };

            if !allowed {
                let (x, y) = intersection_point(&hit);
                return Err(if a.ring == b.ring {
                    format!("{} self-intersects near ({x}, {y})", ring_name(a.ring))
                } else {
                    format!(
                        "{} crosses {} near ({x}, {y})",
                        ring_name(a.ring.min(b.ring)),
                        ring_name(a.ring.max(b.ring))
                    )
                });
            }
        }
    }

    Ok(())
}

fn intersection_point(hit: &LineIntersection<f64>) -> (f64, f64) {
    match hit {
        LineIntersection::SinglePoint { intersection, .. } => intersection.x_y(),
        LineIntersection::Collinear { intersection } => intersection.start.x_y(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fwdet_core::ErrorKind;
    use geo::{line_string, polygon, MultiPolygon};

    fn reason(flood: &FloodPolygon) -> String {
        let err = validate_flood_polygon(flood).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Geometry);
        err.to_string()
    }

    #[test]
    fn test_valid_square_with_hole() {
        let flood = FloodPolygon::from_polygon(polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
            interiors: [[(x: 2.0, y: 2.0), (x: 4.0, y: 2.0), (x: 4.0, y: 4.0), (x: 2.0, y: 4.0)]],
        ));
        assert!(validate_flood_polygon(&flood).is_ok());
    }

    #[test]
    fn test_hole_touching_exterior_at_a_point() {
        let flood = FloodPolygon::from_polygon(polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
            interiors: [[(x: 0.0, y: 5.0), (x: 4.0, y: 3.0), (x: 4.0, y: 7.0)]],
        ));
        assert!(validate_flood_polygon(&flood).is_ok());
    }

    #[test]
    fn test_repeated_vertex_accepted() {
        let flood = FloodPolygon::from_polygon(polygon![
            (x: 1.0, y: 1.0),
            (x: 5.0, y: 1.0),
            (x: 5.0, y: 1.0),
            (x: 5.0, y: 5.0),
            (x: 1.0, y: 5.0),
        ]);
        assert!(validate_flood_polygon(&flood).is_ok());

        // Duplicate closing vertex and a doubled vertex inside a hole
        let flood = FloodPolygon::from_polygon(polygon!(
            exterior: [
                (x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0),
                (x: 0.0, y: 10.0), (x: 0.0, y: 0.0),
            ],
            interiors: [[
                (x: 2.0, y: 2.0), (x: 4.0, y: 2.0), (x: 4.0, y: 4.0),
                (x: 4.0, y: 4.0), (x: 2.0, y: 4.0),
            ]],
        ));
        assert!(validate_flood_polygon(&flood).is_ok());
    }

    #[test]
    fn test_bowtie_rejected() {
        let flood = FloodPolygon::from_polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 10.0, y: 0.0),
            (x: 0.0, y: 6.0),
        ]);
        assert!(reason(&flood).contains("self-intersects"));
    }

    #[test]
    fn test_spike_rejected() {
        // Edge doubles back over its predecessor
        let flood = FloodPolygon::from_polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 5.0, y: 0.0),
            (x: 5.0, y: 5.0),
        ]);
        assert!(reason(&flood).contains("self-intersects"));
    }

    #[test]
    fn test_degenerate_rings_rejected() {
        let flat = FloodPolygon::from_polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 5.0, y: 0.0),
            (x: 10.0, y: 0.0),
        ]);
        assert!(reason(&flat).contains("zero area"));

        let short = FloodPolygon::from_polygon(Polygon::new(
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 0.0, y: 0.0)],
            vec![],
        ));
        assert!(reason(&short).contains("at least 4"));

        let nan = FloodPolygon::from_polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: f64::NAN, y: 0.0),
            (x: 1.0, y: 1.0),
        ]);
        assert!(reason(&nan).contains("non-finite"));
    }

    #[test]
    fn test_hole_outside_exterior_rejected() {
        let flood = FloodPolygon::from_polygon(polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
            interiors: [[(x: 20.0, y: 20.0), (x: 22.0, y: 20.0), (x: 22.0, y: 22.0)]],
        ));
        assert!(reason(&flood).contains("outside the exterior"));
    }

    #[test]
    fn test_crossing_hole_rejected() {
        let flood = FloodPolygon::from_polygon(polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
            interiors: [[(x: 8.0, y: 2.0), (x: 12.0, y: 2.0), (x: 12.0, y: 4.0), (x: 8.0, y: 4.0)]],
        ));
        assert!(reason(&flood).contains("crosses"));
    }

    #[test]
    fn test_empty_extent_rejected() {
        let flood = FloodPolygon::new(MultiPolygon::new(vec![]), None);
        assert!(reason(&flood).contains("no polygons"));
    }
}
