//! Static geospatial reference data
//!
//! Power-line geometry and zone classifications loaded from configuration.
//! Distances are great-circle (haversine) for zones and a local planar
//! projection for line segments, which is accurate well past any clearance
//! distance that matters on a job site.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Coordinates, GeoReference};
use crate::error::SourceError;

/// Mean Earth radius in meters
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A power line as a polyline of support points
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PowerLine {
    #[serde(default)]
    pub name: String,
    pub points: Vec<Coordinates>,
}

/// A circular classified area (high traffic, residential)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Zone {
    #[serde(default)]
    pub name: String,
    pub center: Coordinates,
    pub radius_m: f64,
}

impl Zone {
    pub fn contains(&self, at: Coordinates) -> bool {
        haversine_m(self.center, at) <= self.radius_m
    }
}

/// Great-circle distance between two points in meters
pub fn haversine_m(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Shortest distance from `at` to the segment `a`-`b` in meters
pub fn distance_to_segment_m(at: Coordinates, a: Coordinates, b: Coordinates) -> f64 {
    // Project onto a plane tangent at `at`
    let cos_lat = at.latitude.to_radians().cos();
    let project = |p: Coordinates| {
        (
            (p.longitude - at.longitude).to_radians() * EARTH_RADIUS_M * cos_lat,
            (p.latitude - at.latitude).to_radians() * EARTH_RADIUS_M,
        )
    };
    let (ax, ay) = project(a);
    let (bx, by) = project(b);

    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        ((-ax * dx - ay * dy) / len_sq).clamp(0.0, 1.0)
    };

    let (px, py) = (ax + t * dx, ay + t * dy);
    (px * px + py * py).sqrt()
}

/// Geo reference backed by configured geometry
#[derive(Debug, Clone, Default)]
pub struct StaticGeoReference {
    pub clearance_m: f64,
    pub power_lines: Vec<PowerLine>,
    pub traffic_zones: Vec<Zone>,
    pub residential_zones: Vec<Zone>,
}

impl StaticGeoReference {
    pub fn new(clearance_m: f64) -> Self {
        Self {
            clearance_m,
            ..Default::default()
        }
    }

    pub fn with_power_line(mut self, line: PowerLine) -> Self {
        self.power_lines.push(line);
        self
    }

    pub fn with_traffic_zone(mut self, zone: Zone) -> Self {
        self.traffic_zones.push(zone);
        self
    }

    pub fn with_residential_zone(mut self, zone: Zone) -> Self {
        self.residential_zones.push(zone);
        self
    }

    /// Distance to the closest power line, if any are known
    pub fn nearest_power_line_m(&self, at: Coordinates) -> Option<f64> {
        self.power_lines
            .iter()
            .flat_map(|line| match line.points.as_slice() {
                [single] => vec![haversine_m(at, *single)],
                points => points
                    .windows(2)
                    .map(|w| distance_to_segment_m(at, w[0], w[1]))
                    .collect(),
            })
            .min_by(|a, b| a.total_cmp(b))
    }
}

#[async_trait]
impl GeoReference for StaticGeoReference {
    async fn near_power_lines(&self, at: Coordinates) -> Result<bool, SourceError> {
        Ok(self
            .nearest_power_line_m(at)
            .map(|d| d <= self.clearance_m)
            .unwrap_or(false))
    }

    async fn is_high_traffic(&self, at: Coordinates) -> Result<bool, SourceError> {
        Ok(self.traffic_zones.iter().any(|z| z.contains(at)))
    }

    async fn is_residential(&self, at: Coordinates) -> Result<bool, SourceError> {
        Ok(self.residential_zones.iter().any(|z| z.contains(at)))
    }
}
