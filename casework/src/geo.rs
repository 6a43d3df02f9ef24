//! In-process boundary registry
//!
//! Water body boundaries as simple lat/lon polygons. Containment uses ray
//! casting; proximity is the distance to the nearest boundary edge on a local
//! equirectangular projection, which is accurate to well under a metre at the
//! few-hundred-metre radii the intake pipeline asks about.

use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::external::{BoundaryError, BoundaryLookup, NearbyBody};
use crate::types::WaterBodyId;

const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A coordinate pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Closed ring of vertices; the last vertex connects back to the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<GeoPoint>,
}

impl Polygon {
    pub fn new(vertices: Vec<GeoPoint>) -> Self {
        Self { vertices }
    }

    /// Ray-casting point-in-polygon test. Degenerate rings contain nothing.
    pub fn contains(&self, p: GeoPoint) -> bool {
        let v = &self.vertices;
        if v.len() < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = v.len() - 1;
        for i in 0..v.len() {
            let (a, b) = (v[i], v[j]);
            if (a.lat > p.lat) != (b.lat > p.lat) {
                let cross_lon = a.lon + (p.lat - a.lat) / (b.lat - a.lat) * (b.lon - a.lon);
                if p.lon < cross_lon {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Distance in metres from `p` to the closest point on the boundary.
    pub fn distance_to_boundary_m(&self, p: GeoPoint) -> f64 {
        let v = &self.vertices;
        if v.is_empty() {
            return f64::INFINITY;
        }
        let project = |q: GeoPoint| -> (f64, f64) {
            let x = (q.lon - p.lon).to_radians() * p.lat.to_radians().cos() * EARTH_RADIUS_M;
            let y = (q.lat - p.lat).to_radians() * EARTH_RADIUS_M;
            (x, y)
        };
        if v.len() == 1 {
            let (x, y) = project(v[0]);
            return x.hypot(y);
        }
        (0..v.len())
            .map(|i| segment_distance_to_origin(project(v[i]), project(v[(i + 1) % v.len()])))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Distance from the origin to segment `a`–`b` in the projected plane.
fn segment_distance_to_origin(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (-(a.0 * dx + a.1 * dy) / len_sq).clamp(0.0, 1.0)
    };
    (a.0 + t * dx).hypot(a.1 + t * dy)
}

/// Registry of water body boundaries implementing [`BoundaryLookup`]
#[derive(Debug, Default)]
pub struct PolygonBoundaries {
    entries: RwLock<Vec<(WaterBodyId, Polygon)>>,
}

impl PolygonBoundaries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the boundary of a water body.
    pub fn register(&self, id: WaterBodyId, polygon: Polygon) -> Result<(), BoundaryError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| BoundaryError::Unavailable("registry lock poisoned".into()))?;
        entries.retain(|(existing, _)| *existing != id);
        entries.push((id, polygon));
        entries.sort_by_key(|(id, _)| *id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BoundaryLookup for PolygonBoundaries {
    async fn containing_body(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Option<WaterBodyId>, BoundaryError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| BoundaryError::Unavailable("registry lock poisoned".into()))?;
        let point = GeoPoint::new(lat, lon);
        Ok(entries
            .iter()
            .find(|(_, polygon)| polygon.contains(point))
            .map(|(id, _)| *id))
    }

    async fn nearest_body(
        &self,
        lat: f64,
        lon: f64,
        radius_m: f64,
    ) -> Result<Option<NearbyBody>, BoundaryError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| BoundaryError::Unavailable("registry lock poisoned".into()))?;
        let point = GeoPoint::new(lat, lon);
        let nearest = entries
            .iter()
            .map(|(id, polygon)| NearbyBody {
                water_body_id: *id,
                distance_m: if polygon.contains(point) {
                    0.0
                } else {
                    polygon.distance_to_boundary_m(point)
                },
            })
            .filter(|n| n.distance_m <= radius_m)
            .min_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        Ok(nearest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// Roughly 1.1 km square
    fn square(lat: f64, lon: f64) -> Polygon {
        Polygon::new(vec![
            GeoPoint::new(lat, lon),
            GeoPoint::new(lat, lon + 0.01),
            GeoPoint::new(lat + 0.01, lon + 0.01),
            GeoPoint::new(lat + 0.01, lon),
        ])
    }

    #[test]
    fn test_contains() {
        let lake = square(12.90, 77.60);
        assert!(lake.contains(GeoPoint::new(12.905, 77.605)));
        assert!(!lake.contains(GeoPoint::new(12.915, 77.605)));
        assert!(!Polygon::new(vec![GeoPoint::new(0.0, 0.0)]).contains(GeoPoint::new(0.0, 0.0)));
    }

    #[test]
    fn test_distance_to_edge() {
        let lake = square(12.90, 77.60);
        // 0.001° of latitude north of the top edge ≈ 111 m
        let d = lake.distance_to_boundary_m(GeoPoint::new(12.911, 77.605));
        assert!((d - 111.2).abs() < 1.0, "distance was {}", d);
    }

    #[tokio::test]
    async fn test_lookup_inside_and_nearby() {
        let registry = PolygonBoundaries::new();
        let id = Uuid::new_v4();
        registry.register(id, square(12.90, 77.60)).unwrap();

        assert_eq!(registry.containing_body(12.905, 77.605).await.unwrap(), Some(id));
        assert_eq!(registry.containing_body(12.913, 77.605).await.unwrap(), None);

        let near = registry.nearest_body(12.913, 77.605, 500.0).await.unwrap().unwrap();
        assert_eq!(near.water_body_id, id);
        assert!(near.distance_m > 300.0 && near.distance_m < 400.0);

        assert!(registry.nearest_body(12.95, 77.605, 500.0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_replaces() {
        let registry = PolygonBoundaries::new();
        let id = Uuid::new_v4();
        registry.register(id, square(12.90, 77.60)).unwrap();
        registry.register(id, square(13.00, 77.60)).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.containing_body(12.905, 77.605).await.unwrap(), None);
        assert_eq!(registry.containing_body(13.005, 77.605).await.unwrap(), Some(id));
    }
}
