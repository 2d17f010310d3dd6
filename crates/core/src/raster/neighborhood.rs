//! Neighborhood windows for focal operations

use std::f64::consts::SQRT_2;

/// 8-connected neighbor offsets `(d_row, d_col, step)` where `step` is the
/// distance multiplier in cell units (1 for cardinal, sqrt(2) for diagonal).
pub const D8_OFFSETS: [(isize, isize, f64); 8] = [
    (-1, -1, SQRT_2),
    (-1, 0, 1.0),
    (-1, 1, SQRT_2),
    (0, -1, 1.0),
    (0, 1, 1.0),
    (1, -1, SQRT_2),
    (1, 0, 1.0),
    (1, 1, SQRT_2),
];

/// Defines a window pattern around a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    /// Square window of given radius (side = 2 * radius + 1)
    Square(usize),
    /// Circular window of given radius (in cells)
    Circle(usize),
}

impl Neighborhood {
    /// Square window from an odd side length (e.g. 5 → radius 2)
    pub fn square_of_size(size: usize) -> Self {
        Neighborhood::Square(size / 2)
    }

    /// Get the radius of the neighborhood
    pub fn radius(&self) -> usize {
        match self {
            Neighborhood::Square(r) | Neighborhood::Circle(r) => *r,
        }
    }

    /// Get the size of the neighborhood (width and height)
    pub fn size(&self) -> usize {
        self.radius() * 2 + 1
    }

    /// Check if a relative position is within this neighborhood
    pub fn contains(&self, dr: isize, dc: isize) -> bool {
        match self {
            Neighborhood::Square(r) => {
                let r = *r as isize;
                dr.abs() <= r && dc.abs() <= r
            }
            Neighborhood::Circle(r) => {
                let r = *r as isize;
                dr * dr + dc * dc <= r * r
            }
        }
    }

    /// Relative positions in this neighborhood, row-major, center included
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        let r = self.radius() as isize;
        let mut offsets = Vec::with_capacity(self.size() * self.size());

        for dr in -r..=r {
            for dc in -r..=r {
                if self.contains(dr, dc) {
                    offsets.push((dr, dc));
                }
            }
        }

        offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighborhood_offsets() {
        assert_eq!(Neighborhood::Square(1).offsets().len(), 9);
        assert_eq!(Neighborhood::Square(2).offsets().len(), 25);
        assert_eq!(Neighborhood::square_of_size(5), Neighborhood::Square(2));
        // dr²+dc² <= 4: center, 4 at distance 1, 4 diagonals, 4 at distance 2
        assert_eq!(Neighborhood::Circle(2).offsets().len(), 13);
        assert_eq!(Neighborhood::Circle(0).offsets(), vec![(0, 0)]);
    }

    #[test]
    fn test_d8_steps() {
        for &(dr, dc, step) in &D8_OFFSETS {
            let expected = ((dr * dr + dc * dc) as f64).sqrt();
            assert!((step - expected).abs() < 1e-12);
        }
    }
}
