//! Contour geometry: enclosed area and polygon moments.
//!
//! A contour is the closed boundary polygon traced through the centres of a
//! component's border pixels. Both the area and the moments are computed on
//! that polygon (Green's theorem), not by counting pixels, so a one-pixel or
//! one-pixel-wide component has zero area.

use imageproc::point::Point;

/// Closed boundary polygon of one foreground component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PupilContour {
    points: Vec<Point<i32>>,
}

/// Zeroth and first-order raw moments of a polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawMoments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl PupilContour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point<i32>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Absolute enclosed area by the shoelace formula.
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }

        let twice_area: f64 = (0..n)
            .map(|i| {
                let p = self.points[i];
                let q = self.points[(i + 1) % n];
                p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64
            })
            .sum();

        twice_area.abs() * 0.5
    }

    /// Raw polygon moments, oriented so that `m00` is non-negative.
    pub fn moments(&self) -> RawMoments {
        let n = self.points.len();
        let mut a00 = 0.0;
        let mut a10 = 0.0;
        let mut a01 = 0.0;

        for i in 0..n {
            let prev = self.points[(i + n - 1) % n];
            let curr = self.points[i];
            let (xp, yp) = (prev.x as f64, prev.y as f64);
            let (xc, yc) = (curr.x as f64, curr.y as f64);

            let cross = xp * yc - xc * yp;
            a00 += cross;
            a10 += cross * (xp + xc);
            a01 += cross * (yp + yc);
        }

        let sign = if a00 < 0.0 { -1.0 } else { 1.0 };
        RawMoments {
            m00: sign * a00 / 2.0,
            m10: sign * a10 / 6.0,
            m01: sign * a01 / 6.0,
        }
    }
}

impl RawMoments {
    /// Centroid truncated toward zero, or `None` for a degenerate polygon.
    pub fn centroid(&self) -> Option<(i32, i32)> {
        if self.m00 == 0.0 {
            return None;
        }
        let cx = self.m10 / self.m00;
        let cy = self.m01 / self.m00;
        Some((cx.trunc() as i32, cy.trunc() as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contour(points: &[(i32, i32)]) -> PupilContour {
        PupilContour::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    #[test]
    fn test_square_area_and_centroid() {
        // Traced clockwise in image coordinates.
        let square = contour(&[(10, 10), (10, 20), (20, 20), (20, 10)]);
        assert!((square.area() - 100.0).abs() < 1e-9);

        let m = square.moments();
        assert!((m.m00 - 100.0).abs() < 1e-9);
        assert_eq!(m.centroid(), Some((15, 15)));
    }

    #[test]
    fn test_orientation_does_not_matter() {
        let cw = contour(&[(0, 0), (0, 4), (6, 4), (6, 0)]);
        let ccw = contour(&[(0, 0), (6, 0), (6, 4), (0, 4)]);
        assert_eq!(cw.area(), ccw.area());
        assert_eq!(cw.moments(), ccw.moments());
    }

    #[test]
    fn test_centroid_truncates() {
        // Triangle centroid is (5/3, 5/3).
        let tri = contour(&[(0, 0), (5, 0), (0, 5)]);
        assert_eq!(tri.moments().centroid(), Some((1, 1)));
    }

    #[test]
    fn test_degenerate_contours() {
        let single = contour(&[(3, 4)]);
        assert_eq!(single.area(), 0.0);
        assert_eq!(single.moments().centroid(), None);

        // A one-pixel-wide line traced out and back encloses nothing.
        let line = contour(&[(0, 0), (1, 0), (2, 0), (1, 0)]);
        assert_eq!(line.area(), 0.0);
        assert_eq!(line.moments().centroid(), None);
    }
}
