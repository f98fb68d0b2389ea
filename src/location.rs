//! Resolution of location names to distances.
//!
//! The cost matrix needs a distance for every (facility, destination) pair. How that distance is
//! obtained is hidden behind the [`DistanceSource`] trait: the default [`LocationCatalog`] uses
//! great-circle distances between known coordinates, while [`DistanceTable`] serves precomputed
//! figures (e.g. from a routing service).
use crate::error::{PlanningError, PlanningResult};
use crate::units::Miles;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use unicase::UniCase;

/// Mean radius of the Earth in miles
const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Ratio of road distance to great-circle distance
const ROAD_CIRCUITY_FACTOR: f64 = 1.2;

/// Minimum distance for any lane, covering local delivery within the same metro area
pub const LOCAL_DELIVERY_MILES: Miles = Miles(10.0);

/// Coordinates of a location in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lon: f64,
}

/// Built-in coordinates for common US logistics locations
const KNOWN_LOCATIONS: &[(&str, f64, f64)] = &[
    ("Albany, NY", 42.6526, -73.7562),
    ("Albuquerque, NM", 35.0844, -106.6504),
    ("Allentown, PA", 40.6023, -75.4714),
    ("Atlanta, GA", 33.7490, -84.3880),
    ("Austin, TX", 30.2672, -97.7431),
    ("Baltimore, MD", 39.2904, -76.6122),
    ("Birmingham, AL", 33.5186, -86.8104),
    ("Boise, ID", 43.6150, -116.2023),
    ("Boston, MA", 42.3601, -71.0589),
    ("Buffalo, NY", 42.8864, -78.8784),
    ("Charleston, SC", 32.7765, -79.9311),
    ("Charlotte, NC", 35.2271, -80.8431),
    ("Chicago, IL", 41.8781, -87.6298),
    ("Cincinnati, OH", 39.1031, -84.5120),
    ("Cleveland, OH", 41.4993, -81.6944),
    ("Columbia, SC", 34.0007, -81.0348),
    ("Columbus, OH", 39.9612, -82.9988),
    ("Dallas, TX", 32.7767, -96.7970),
    ("Denver, CO", 39.7392, -104.9903),
    ("Des Moines, IA", 41.5868, -93.6250),
    ("Detroit, MI", 42.3314, -83.0458),
    ("El Paso, TX", 31.7619, -106.4850),
    ("Harrisburg, PA", 40.2732, -76.8867),
    ("Hartford, CT", 41.7658, -72.6734),
    ("Houston, TX", 29.7604, -95.3698),
    ("Indianapolis, IN", 39.7684, -86.1581),
    ("Jacksonville, FL", 30.3322, -81.6557),
    ("Kansas City, MO", 39.0997, -94.5786),
    ("Las Vegas, NV", 36.1699, -115.1398),
    ("Little Rock, AR", 34.7465, -92.2896),
    ("Littleton, MA", 42.5334, -71.4912),
    ("Los Angeles, CA", 34.0522, -118.2437),
    ("Louisville, KY", 38.2527, -85.7585),
    ("Manchester, NH", 42.9956, -71.4548),
    ("Memphis, TN", 35.1495, -90.0490),
    ("Miami, FL", 25.7617, -80.1918),
    ("Milwaukee, WI", 43.0389, -87.9065),
    ("Minneapolis, MN", 44.9778, -93.2650),
    ("Nashville, TN", 36.1627, -86.7816),
    ("New Orleans, LA", 29.9511, -90.0715),
    ("New York, NY", 40.7128, -74.0060),
    ("Newark, NJ", 40.7357, -74.1724),
    ("Oklahoma City, OK", 35.4676, -97.5164),
    ("Omaha, NE", 41.2565, -95.9345),
    ("Orlando, FL", 28.5383, -81.3792),
    ("Philadelphia, PA", 39.9526, -75.1652),
    ("Phoenix, AZ", 33.4484, -112.0740),
    ("Pittsburgh, PA", 40.4406, -79.9959),
    ("Portland, ME", 43.6591, -70.2568),
    ("Portland, OR", 45.5152, -122.6784),
    ("Providence, RI", 41.8240, -71.4128),
    ("Raleigh, NC", 35.7796, -78.6382),
    ("Reno, NV", 39.5296, -119.8138),
    ("Richmond, VA", 37.5407, -77.4360),
    ("Sacramento, CA", 38.5816, -121.4944),
    ("Salt Lake City, UT", 40.7608, -111.8910),
    ("San Antonio, TX", 29.4241, -98.4936),
    ("San Diego, CA", 32.7157, -117.1611),
    ("San Francisco, CA", 37.7749, -122.4194),
    ("Savannah, GA", 32.0809, -81.0912),
    ("Seattle, WA", 47.6062, -122.3321),
    ("St. Louis, MO", 38.6270, -90.1994),
    ("Tampa, FL", 27.9506, -82.4572),
    ("Washington, DC", 38.9072, -77.0369),
];

/// Something which can provide the road distance between two named locations
pub trait DistanceSource {
    /// Distance between `from` and `to`.
    ///
    /// Returns [`PlanningError::UnresolvedLocation`] if either location is unknown. Never
    /// returns a made-up distance.
    fn distance(&self, from: &str, to: &str) -> PlanningResult<Miles>;
}

/// Great-circle distance between two points in miles
pub fn haversine_miles(a: Coordinates, b: Coordinates) -> Miles {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    Miles(2.0 * EARTH_RADIUS_MILES * h.sqrt().asin())
}

/// Estimated road distance between two points, floored at the local delivery distance
pub fn road_miles(a: Coordinates, b: Coordinates) -> Miles {
    Miles(haversine_miles(a, b).value() * ROAD_CIRCUITY_FACTOR).max(LOCAL_DELIVERY_MILES)
}

/// A catalogue of location coordinates, looked up case-insensitively by name
pub struct LocationCatalog {
    coordinates: HashMap<UniCase<String>, Coordinates>,
    cache: RefCell<HashMap<(String, String), Miles>>,
}

impl Default for LocationCatalog {
    fn default() -> Self {
        Self::with_locations(HashMap::new())
    }
}

impl LocationCatalog {
    /// A catalogue with the built-in locations plus (or overridden by) `extra`
    pub fn with_locations<I>(extra: I) -> Self
    where
        I: IntoIterator<Item = (String, Coordinates)>,
    {
        let mut coordinates: HashMap<_, _> = KNOWN_LOCATIONS
            .iter()
            .map(|&(name, lat, lon)| (UniCase::new(name.to_string()), Coordinates { lat, lon }))
            .collect();
        coordinates.extend(
            extra
                .into_iter()
                .map(|(name, coords)| (UniCase::new(name.trim().to_string()), coords)),
        );

        Self {
            coordinates,
            cache: RefCell::default(),
        }
    }

    /// Look up the coordinates for a location
    pub fn coordinates(&self, name: &str) -> PlanningResult<Coordinates> {
        self.coordinates
            .get(&UniCase::new(name.trim().to_string()))
            .copied()
            .ok_or_else(|| {
                PlanningError::UnresolvedLocation(format!("No coordinates known for \"{name}\""))
            })
    }
}

impl DistanceSource for LocationCatalog {
    fn distance(&self, from: &str, to: &str) -> PlanningResult<Miles> {
        let key = (from.to_string(), to.to_string());
        if let Some(distance) = self.cache.borrow().get(&key) {
            return Ok(*distance);
        }

        let distance = road_miles(self.coordinates(from)?, self.coordinates(to)?);
        self.cache.borrow_mut().insert(key, distance);

        Ok(distance)
    }
}

/// A table of precomputed distances between named locations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceTable(HashMap<(String, String), Miles>);

impl DistanceTable {
    /// Create a new, empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the distance between two locations
    pub fn insert(&mut self, from: &str, to: &str, distance: Miles) {
        self.0.insert((from.to_string(), to.to_string()), distance);
    }
}

impl FromIterator<(&'static str, &'static str, f64)> for DistanceTable {
    fn from_iter<I: IntoIterator<Item = (&'static str, &'static str, f64)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (from, to, distance) in iter {
            table.insert(from, to, Miles(distance));
        }
        table
    }
}

impl DistanceSource for DistanceTable {
    fn distance(&self, from: &str, to: &str) -> PlanningResult<Miles> {
        self.0
            .get(&(from.to_string(), to.to_string()))
            .copied()
            .ok_or_else(|| {
                PlanningError::UnresolvedLocation(format!(
                    "No distance known from \"{from}\" to \"{to}\""
                ))
            })
    }
}
