//! Office geofence for location-based attendance.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeofenceError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeofenceError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeofenceError {
    #[error("invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
    #[error("{distance:.0} m from the office, allowed radius is {radius:.0} m")]
    OutsideRadius { distance: f64, radius: f64 },
}

/// Great-circle distance between two points, in meters.
pub fn haversine_meters(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// An office location and how far from it a check-in may be.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Office {
    pub location: Coordinate,
    pub radius_meters: f64,
}

impl Office {
    /// Distance of `position` from the office if it is inside the radius.
    pub fn check(&self, position: Coordinate) -> Result<f64, GeofenceError> {
        let distance = haversine_meters(self.location, position);
        if distance > self.radius_meters {
            return Err(GeofenceError::OutsideRadius {
                distance,
                radius: self.radius_meters,
            });
        }
        Ok(distance)
    }
}
