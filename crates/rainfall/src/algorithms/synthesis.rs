use std::f64::consts::PI;

use geo_types::{Coord, LineString, Polygon};
use crate::traits::AreaSynthesizer;

pub const DEFAULT_RADIUS_DEGREES: f64 = 0.003;
pub const DEFAULT_CIRCLE_POINTS: usize = 30;

/// Planar circle approximation in degree space. Only valid while the
/// radius is small relative to the bounding box.
#[derive(Debug, Clone, Copy)]
pub struct CircleSynthesizer {
    pub radius_degrees: f64,
    pub points: usize,
}

impl CircleSynthesizer {
    pub fn new(radius_degrees: f64, points: usize) -> Self {
        Self { radius_degrees, points }
    }

    /// The `points` distinct vertices, starting at angle 0 and turning counter-clockwise
    pub fn vertices(&self, center: Coord<f64>) -> Vec<Coord<f64>> {
        (0..self.points)
            .map(|i| {
                let angle = 2.0 * PI * i as f64 / self.points as f64;
                Coord {
                    x: center.x + self.radius_degrees * angle.cos(),
                    y: center.y + self.radius_degrees * angle.sin(),
                }
            })
            .collect()
    }
}

impl Default for CircleSynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS_DEGREES, DEFAULT_CIRCLE_POINTS)
    }
}

impl AreaSynthesizer for CircleSynthesizer {
    fn synthesize(&self, center: Coord<f64>) -> Polygon<f64> {
        // Polygon::new closes the exterior ring
        Polygon::new(LineString::new(self.vertices(center)), vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Centroid;

    const CENTER: Coord<f64> = Coord { x: -103.5, y: 20.7 };

    #[test]
    fn test_vertex_count_and_closed_ring() {
        let polygon = CircleSynthesizer::default().synthesize(CENTER);
        let ring = polygon.exterior();
        assert_eq!(ring.0.len(), DEFAULT_CIRCLE_POINTS + 1);
        assert!(ring.is_closed());
    }

    #[test]
    fn test_vertices_lie_on_radius() {
        let synthesizer = CircleSynthesizer::new(0.25, 12);
        for v in synthesizer.vertices(CENTER) {
            let distance = ((v.x - CENTER.x).powi(2) + (v.y - CENTER.y).powi(2)).sqrt();
            assert!((distance - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn test_vertices_evenly_spaced() {
        let synthesizer = CircleSynthesizer::new(1.0, 8);
        let vertices = synthesizer.vertices(CENTER);
        let step = 2.0 * PI / 8.0;
        for (i, v) in vertices.iter().enumerate() {
            let angle = (v.y - CENTER.y).atan2(v.x - CENTER.x).rem_euclid(2.0 * PI);
            assert!((angle - step * i as f64).abs() < 1e-9, "vertex {} at {}", i, angle);
        }
        assert_eq!(vertices[0], Coord { x: CENTER.x + 1.0, y: CENTER.y });
    }

    #[test]
    fn test_centroid_is_center() {
        let polygon = CircleSynthesizer::new(0.5, 30).synthesize(CENTER);
        let centroid = polygon.centroid().expect("non-degenerate polygon");
        assert!((centroid.x() - CENTER.x).abs() < 1e-6);
        assert!((centroid.y() - CENTER.y).abs() < 1e-6);
    }
}
