//! # Geofence
//!
//! Decides whether a GPS fix allows clocking in at a site: close enough to
//! the site centre, and accurate enough to trust.

use crate::shared::SharedError;
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula, in metres
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Fixes less accurate than this are refused by default, in metres
pub const DEFAULT_MAX_ACCURACY_M: f64 = 50.0;

/// WGS84 coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, SharedError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(SharedError::validation("lat", format!("{} is out of range", lat)));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(SharedError::validation("lng", format!("{} is out of range", lng)));
        }
        Ok(Self { lat, lng })
    }
}

/// Great-circle distance between two points, in metres
pub fn haversine_distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Circular work site
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteFence {
    pub center: GeoPoint,
    pub radius_m: f64,
}

/// Position reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFix {
    pub point: GeoPoint,
    /// Horizontal accuracy radius, in metres
    pub accuracy_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FenceCheck {
    /// Fix too imprecise to decide
    AccuracyTooLow { accuracy_m: f64, max_accuracy_m: f64 },
    Inside { distance_m: f64 },
    Outside { distance_m: f64, excess_m: f64 },
}

impl FenceCheck {
    pub fn allows_clock_in(&self) -> bool {
        matches!(self, FenceCheck::Inside { .. })
    }
}

pub fn check(fix: &LocationFix, fence: &SiteFence, max_accuracy_m: f64) -> FenceCheck {
    if fix.accuracy_m > max_accuracy_m {
        return FenceCheck::AccuracyTooLow {
            accuracy_m: fix.accuracy_m,
            max_accuracy_m,
        };
    }

    let distance_m = haversine_distance_m(fix.point, fence.center);
    if distance_m <= fence.radius_m {
        FenceCheck::Inside { distance_m }
    } else {
        FenceCheck::Outside {
            distance_m,
            excess_m: distance_m - fence.radius_m,
        }
    }
}
