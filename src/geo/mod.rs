//! Fixed-point coordinates
//!
//! Latitudes and longitudes are stored as integers in units of 1e-7 degree. Offsets are
//! added in fixed point, so stepping away from a point and back lands on exactly the same
//! point and points can be hashed.

use std::fmt;

const UNITS_PER_DEGREE: f64 = 1e7;
const MAX_LAT_E7: i64 = 90 * 10_000_000;
const FULL_TURN_E7: i64 = 360 * 10_000_000;
const HALF_TURN_E7: i64 = 180 * 10_000_000;

/// A neighbour offset in fixed-point units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Delta(i64);

impl Delta {
    pub fn from_degrees(degrees: f64) -> Self {
        Delta(to_e7(degrees).abs())
    }

    pub fn from_e7(units: i64) -> Self {
        Delta(units.abs())
    }

    pub fn degrees(self) -> f64 {
        self.0 as f64 / UNITS_PER_DEGREE
    }

    pub fn e7(self) -> i64 {
        self.0
    }

    /// Half of this offset, never below `floor`
    pub fn halved(self, floor: Delta) -> Delta {
        Delta(self.0 / 2).max(floor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeoPoint {
    lat_e7: i64,
    lng_e7: i64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self::from_e7(to_e7(lat), to_e7(lng))
    }

    /// Builds a point, clamping latitude to the poles and wrapping longitude
    pub fn from_e7(lat_e7: i64, lng_e7: i64) -> Self {
        Self {
            lat_e7: lat_e7.clamp(-MAX_LAT_E7, MAX_LAT_E7),
            lng_e7: wrap_lng(lng_e7),
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat_e7 as f64 / UNITS_PER_DEGREE
    }

    pub fn lng(&self) -> f64 {
        self.lng_e7 as f64 / UNITS_PER_DEGREE
    }

    /// Moves by whole multiples of `delta` north (`dlat`) and east (`dlng`)
    pub fn offset(&self, dlat: i64, dlng: i64, delta: Delta) -> GeoPoint {
        GeoPoint::from_e7(
            self.lat_e7 + dlat * delta.e7(),
            self.lng_e7 + dlng * delta.e7(),
        )
    }

    /// The eight compass neighbours: N, NE, E, SE, S, SW, W, NW
    pub fn neighbours(&self, delta: Delta) -> [GeoPoint; 8] {
        [
            self.offset(1, 0, delta),
            self.offset(1, 1, delta),
            self.offset(0, 1, delta),
            self.offset(-1, 1, delta),
            self.offset(-1, 0, delta),
            self.offset(-1, -1, delta),
            self.offset(0, -1, delta),
            self.offset(1, -1, delta),
        ]
    }

    /// This point followed by its eight neighbours
    pub fn with_neighbours(&self, delta: Delta) -> [GeoPoint; 9] {
        let n = self.neighbours(delta);
        [*self, n[0], n[1], n[2], n[3], n[4], n[5], n[6], n[7]]
    }

    /// The `ll` query parameter, `"<lat>,<lng>"`
    pub fn ll_param(&self) -> String {
        self.to_string()
    }

    /// Planar distance in degrees, good enough for region cut-offs
    pub fn distance_deg(&self, other: &GeoPoint) -> f64 {
        let dlat = self.lat() - other.lat();
        let mut dlng = (self.lng_e7 - other.lng_e7).abs();
        if dlng > HALF_TURN_E7 {
            dlng = FULL_TURN_E7 - dlng;
        }
        let dlng = dlng as f64 / UNITS_PER_DEGREE;
        (dlat * dlat + dlng * dlng).sqrt()
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.7},{:.7}", self.lat(), self.lng())
    }
}

fn to_e7(degrees: f64) -> i64 {
    (degrees * UNITS_PER_DEGREE).round() as i64
}

/// Maps longitude into [-180, 180); the antimeridian is always -180
fn wrap_lng(lng_e7: i64) -> i64 {
    (lng_e7 + HALF_TURN_E7).rem_euclid(FULL_TURN_E7) - HALF_TURN_E7
}
