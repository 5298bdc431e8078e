#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Geographic distance math and an in-memory spatial index for zones.
//!
//! Zones are circles, so containment is a haversine distance check.
//! [`ZoneIndex`] wraps the zone set in an R-tree of bounding boxes so
//! the proximity evaluator can test a point against many zones with an
//! envelope prefilter followed by the exact distance check.

use rstar::{AABB, RTree, RTreeObject};
use safewatch_models::{Coordinates, Zone};

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Approximate meters per degree of latitude, used only to size
/// R-tree envelopes. Containment itself is always the exact check.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Great-circle distance between two points in kilometers (haversine).
#[must_use]
pub fn distance_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Great-circle distance between two points in meters.
#[must_use]
pub fn distance_meters(a: Coordinates, b: Coordinates) -> f64 {
    distance_km(a, b) * 1000.0
}

/// Whether `point` lies within `radius_km` of `center`.
#[must_use]
pub fn within_radius_km(center: Coordinates, point: Coordinates, radius_km: f64) -> bool {
    distance_km(center, point) <= radius_km
}

/// Whether a point falls inside a zone's circle.
#[must_use]
pub fn point_in_zone(point: Coordinates, zone: &Zone) -> bool {
    distance_meters(point, zone.center) <= zone.radius_meters
}

/// A zone stored in the R-tree with its bounding envelope and its
/// position in the input ordering.
struct ZoneEntry {
    envelope: AABB<[f64; 2]>,
    ord: usize,
    zone: Zone,
}

impl RTreeObject for ZoneEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built spatial index over a zone set.
///
/// Built once per clustering pass and shared with every proximity
/// evaluation until the next pass replaces it. Lookups return matches
/// in the original zone ordering (manual zones first, then auto zones
/// by descending average risk), so the first match is the one the
/// evaluator should report.
pub struct ZoneIndex {
    tree: RTree<ZoneEntry>,
    len: usize,
}

impl ZoneIndex {
    /// Builds the index from an ordered zone set.
    #[must_use]
    pub fn new(zones: Vec<Zone>) -> Self {
        let len = zones.len();
        let entries = zones
            .into_iter()
            .enumerate()
            .map(|(ord, zone)| ZoneEntry {
                envelope: circle_envelope(zone.center, zone.radius_meters),
                ord,
                zone,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
            len,
        }
    }

    /// Number of indexed zones.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no zones.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns all zones whose circle contains the point, in the
    /// original input ordering.
    #[must_use]
    pub fn containing(&self, point: Coordinates) -> Vec<&Zone> {
        let query_env = AABB::from_point([point.longitude, point.latitude]);

        let mut matches: Vec<&ZoneEntry> = self
            .tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| point_in_zone(point, &entry.zone))
            .collect();
        matches.sort_by_key(|entry| entry.ord);
        matches.into_iter().map(|entry| &entry.zone).collect()
    }

    /// Returns the first (highest-precedence) zone containing the
    /// point, if any.
    #[must_use]
    pub fn first_containing(&self, point: Coordinates) -> Option<&Zone> {
        self.containing(point).into_iter().next()
    }
}

/// Bounding box of a circle, padded so the envelope always covers the
/// circle even at high latitudes.
fn circle_envelope(center: Coordinates, radius_meters: f64) -> AABB<[f64; 2]> {
    let d_lat = radius_meters / METERS_PER_DEGREE;
    let cos_lat = center.latitude.to_radians().cos().abs().max(0.01);
    let d_lng = radius_meters / (METERS_PER_DEGREE * cos_lat);

    AABB::from_corners(
        [center.longitude - d_lng, center.latitude - d_lat],
        [center.longitude + d_lng, center.latitude + d_lat],
    )
}
