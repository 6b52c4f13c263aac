//! Axis-aligned geographic rectangle.

use serde::{Deserialize, Serialize};

use super::types::{CoordError, TileKey};

/// Geographic bounding box in degrees.
///
/// Serialized the way the raster backend exchanges bounds:
/// `[[south, west], [north, east]]`.
///
/// Outside this crate bounds are only built through [`GeoBounds::new`] (or
/// deserialization, which validates the same way), so `south <= north` and
/// `west <= east` always hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[[f64; 2]; 2]", into = "[[f64; 2]; 2]")]
pub struct GeoBounds {
    /// Southern edge (minimum latitude)
    pub(crate) south: f64,
    /// Western edge (minimum longitude)
    pub(crate) west: f64,
    /// Northern edge (maximum latitude)
    pub(crate) north: f64,
    /// Eastern edge (maximum longitude)
    pub(crate) east: f64,
}

impl GeoBounds {
    /// Create validated bounds.
    ///
    /// # Errors
    ///
    /// Returns `CoordError` if any edge is non-finite or if the edges are
    /// inverted.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Result<Self, CoordError> {
        if ![south, west, north, east].iter().all(|v| v.is_finite()) {
            return Err(CoordError::NonFinite {
                south,
                west,
                north,
                east,
            });
        }
        if south > north {
            return Err(CoordError::InvertedLatitude { south, north });
        }
        if west > east {
            return Err(CoordError::InvertedLongitude { west, east });
        }
        Ok(Self {
            south,
            west,
            north,
            east,
        })
    }

    /// Create bounds from `[[south, west], [north, east]]` corners.
    pub fn from_corners(corners: [[f64; 2]; 2]) -> Result<Self, CoordError> {
        let [[south, west], [north, east]] = corners;
        Self::new(south, west, north, east)
    }

    pub fn south(&self) -> f64 {
        self.south
    }

    pub fn west(&self) -> f64 {
        self.west
    }

    pub fn north(&self) -> f64 {
        self.north
    }

    pub fn east(&self) -> f64 {
        self.east
    }

    /// The `[[south, west], [north, east]]` corner pair.
    pub fn corners(&self) -> [[f64; 2]; 2] {
        [[self.south, self.west], [self.north, self.east]]
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Center point as `(lat, lng)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// True when the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// True when the two rectangles share a region of positive area.
    ///
    /// Rectangles that only touch along an edge do not intersect.
    pub fn intersects(&self, other: &GeoBounds) -> bool {
        self.south < other.north
            && other.south < self.north
            && self.west < other.east
            && other.west < self.east
    }

    /// Overlapping region of two rectangles, or `None` if they do not
    /// intersect.
    pub fn intersection(&self, other: &GeoBounds) -> Option<GeoBounds> {
        if !self.intersects(other) {
            return None;
        }
        Some(GeoBounds {
            south: self.south.max(other.south),
            west: self.west.max(other.west),
            north: self.north.min(other.north),
            east: self.east.min(other.east),
        })
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains(&self, other: &GeoBounds) -> bool {
        other.south >= self.south
            && other.north <= self.north
            && other.west >= self.west
            && other.east <= self.east
    }

    /// Expand the rectangle by `fraction` of its own height (latitude) and
    /// width (longitude) on every side.
    ///
    /// Non-positive or non-finite fractions return the bounds unchanged.
    pub fn padded(&self, fraction: f64) -> GeoBounds {
        if !fraction.is_finite() || fraction <= 0.0 {
            return *self;
        }
        let dlat = self.height() * fraction;
        let dlng = self.width() * fraction;
        GeoBounds {
            south: self.south - dlat,
            west: self.west - dlng,
            north: self.north + dlat,
            east: self.east + dlng,
        }
    }

    /// Cache identity of this region.
    pub fn key(&self) -> TileKey {
        TileKey::from_bounds(self)
    }
}

impl TryFrom<[[f64; 2]; 2]> for GeoBounds {
    type Error = CoordError;

    fn try_from(corners: [[f64; 2]; 2]) -> Result<Self, Self::Error> {
        Self::from_corners(corners)
    }
}

impl From<GeoBounds> for [[f64; 2]; 2] {
    fn from(bounds: GeoBounds) -> Self {
        bounds.corners()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bogota() -> GeoBounds {
        GeoBounds::new(4.5, -74.2, 4.6, -74.0).unwrap()
    }

    #[test]
    fn test_new_rejects_inverted_latitude() {
        let result = GeoBounds::new(5.0, 0.0, 4.0, 1.0);
        assert!(matches!(result, Err(CoordError::InvertedLatitude { .. })));
    }

    #[test]
    fn test_new_rejects_inverted_longitude() {
        let result = GeoBounds::new(0.0, 179.0, 1.0, -179.0);
        assert!(matches!(result, Err(CoordError::InvertedLongitude { .. })));
    }

    #[test]
    fn test_new_rejects_nan() {
        let result = GeoBounds::new(f64::NAN, 0.0, 1.0, 1.0);
        assert!(matches!(result, Err(CoordError::NonFinite { .. })));
    }

    #[test]
    fn test_edges_and_default() {
        let b = bogota();
        assert_eq!((b.south(), b.west(), b.north(), b.east()), (4.5, -74.2, 4.6, -74.0));

        let origin = GeoBounds::default();
        assert_eq!(GeoBounds::new(0.0, 0.0, 0.0, 0.0), Ok(origin));
        assert!(origin.is_empty());
    }

    #[test]
    fn test_deserialize_rejects_inverted() {
        let result = serde_json::from_str::<GeoBounds>("[[5.0, 0.0], [4.0, 1.0]]");
        assert!(result.is_err());
    }

    #[test]
    fn test_width_height_center() {
        let b = bogota();
        assert!((b.width() - 0.2).abs() < 1e-12);
        assert!((b.height() - 0.1).abs() < 1e-12);
        let (lat, lng) = b.center();
        assert!((lat - 4.55).abs() < 1e-12);
        assert!((lng + 74.1).abs() < 1e-12);
    }

    #[test]
    fn test_intersection_overlapping() {
        let a = GeoBounds::new(0.0, 0.0, 2.0, 2.0).unwrap();
        let b = GeoBounds::new(1.0, 1.0, 3.0, 3.0).unwrap();
        let i = a.intersection(&b).unwrap();
        assert_eq!(i, GeoBounds::new(1.0, 1.0, 2.0, 2.0).unwrap());
    }

    #[test]
    fn test_intersection_disjoint() {
        let a = GeoBounds::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let b = GeoBounds::new(5.0, 5.0, 6.0, 6.0).unwrap();
        assert!(a.intersection(&b).is_none());
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_touching_edges_do_not_intersect() {
        let a = GeoBounds::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let b = GeoBounds::new(0.0, 1.0, 1.0, 2.0).unwrap();
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_padded_expands_symmetrically() {
        let a = GeoBounds::new(0.0, 0.0, 10.0, 20.0).unwrap();
        let p = a.padded(0.1);
        assert_eq!(p, GeoBounds::new(-1.0, -2.0, 11.0, 22.0).unwrap());
        assert!(p.contains(&a));
    }

    #[test]
    fn test_padded_ignores_bad_fraction() {
        let a = bogota();
        assert_eq!(a.padded(0.0), a);
        assert_eq!(a.padded(-0.5), a);
        assert_eq!(a.padded(f64::NAN), a);
    }

    #[test]
    fn test_serde_corner_format() {
        let b = bogota();
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "[[4.5,-74.2],[4.6,-74.0]]");

        let parsed: GeoBounds = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, b);
    }

    #[test]
    fn test_serde_rejects_inverted() {
        let result: Result<GeoBounds, _> = serde_json::from_str("[[5.0,0.0],[4.0,1.0]]");
        assert!(result.is_err());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_intersection_is_contained_in_both(
                s1 in -80.0..80.0_f64, w1 in -170.0..170.0_f64,
                h1 in 0.001..5.0_f64, d1 in 0.001..5.0_f64,
                s2 in -80.0..80.0_f64, w2 in -170.0..170.0_f64,
                h2 in 0.001..5.0_f64, d2 in 0.001..5.0_f64,
            ) {
                let a = GeoBounds::new(s1, w1, s1 + h1, w1 + d1).unwrap();
                let b = GeoBounds::new(s2, w2, s2 + h2, w2 + d2).unwrap();
                if let Some(i) = a.intersection(&b) {
                    prop_assert!(a.contains(&i));
                    prop_assert!(b.contains(&i));
                    prop_assert!(!i.is_empty());
                } else {
                    prop_assert!(!b.intersects(&a));
                }
            }

            #[test]
            fn test_key_stable_for_copies(
                s in -80.0..80.0_f64, w in -170.0..170.0_f64,
                h in 0.0..5.0_f64, d in 0.0..5.0_f64,
            ) {
                let a = GeoBounds::new(s, w, s + h, w + d).unwrap();
                let b = GeoBounds::from_corners(a.corners()).unwrap();
                prop_assert_eq!(a.key(), b.key());
            }
        }
    }
}
