//! R-tree index over hazard locations for radius queries.
//!
//! Points are stored as `[lng, lat]` degrees. A radius query first
//! collects candidates from a degree-padded bounding box and then keeps
//! only those whose great-circle distance is within the radius, so the
//! result is identical to a linear haversine scan.

use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};

use road_hazard_models::GeoPoint;

use crate::{METERS_PER_DEGREE, distance_meters};

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// Padding applied to the degree box so rounding never drops a candidate.
const ENVELOPE_SLACK: f64 = 1.05;

/// Spatial index of points, each tagged with its position in the slice it
/// was built from.
pub struct PointIndex {
    tree: RTree<IndexedPoint>,
}

impl PointIndex {
    /// Builds the index. Invalid points are skipped.
    #[must_use]
    pub fn build(points: impl IntoIterator<Item = GeoPoint>) -> Self {
        let entries: Vec<IndexedPoint> = points
            .into_iter()
            .enumerate()
            .filter(|(_, p)| p.is_valid())
            .map(|(i, p)| GeomWithData::new([p.lng, p.lat], i))
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Returns `(index, distance_m)` for every point within `radius_m`
    /// (inclusive) of `center`, in no particular order.
    #[must_use]
    pub fn within(&self, center: GeoPoint, radius_m: f64) -> Vec<(usize, f64)> {
        if !center.is_valid() || radius_m.is_nan() || radius_m < 0.0 {
            return Vec::new();
        }

        let mut hits = Vec::new();
        for envelope in search_envelopes(center, radius_m) {
            for entry in self.tree.locate_in_envelope_intersecting(&envelope) {
                let [lng, lat] = *entry.geom();
                let distance = distance_meters(center, GeoPoint::new(lat, lng));
                if distance <= radius_m {
                    hits.push((entry.data, distance));
                }
            }
        }
        hits
    }
}

/// Degree boxes covering a circle of `radius_m` around `center`, split in
/// two when the circle crosses the antimeridian.
fn search_envelopes(center: GeoPoint, radius_m: f64) -> Vec<AABB<[f64; 2]>> {
    let lat_pad = radius_m / METERS_PER_DEGREE * ENVELOPE_SLACK;
    let min_lat = (center.lat - lat_pad).max(-90.0);
    let max_lat = (center.lat + lat_pad).min(90.0);

    let cos_lat = min_lat
        .to_radians()
        .cos()
        .min(max_lat.to_radians().cos());
    let lng_pad = if cos_lat <= 1e-9 {
        360.0
    } else {
        lat_pad / cos_lat
    };

    if lng_pad >= 180.0 {
        return vec![AABB::from_corners([-180.0, min_lat], [180.0, max_lat])];
    }

    let min_lng = center.lng - lng_pad;
    let max_lng = center.lng + lng_pad;

    let mut envelopes = vec![AABB::from_corners(
        [min_lng.max(-180.0), min_lat],
        [max_lng.min(180.0), max_lat],
    )];
    if min_lng < -180.0 {
        envelopes.push(AABB::from_corners([min_lng + 360.0, min_lat], [180.0, max_lat]));
    }
    if max_lng > 180.0 {
        envelopes.push(AABB::from_corners([-180.0, min_lat], [max_lng - 360.0, max_lat]));
    }
    envelopes
}
