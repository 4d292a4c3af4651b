use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Builds a point from a latitude/longitude pair that must be supplied
    /// together. `Ok(None)` when both halves are absent.
    pub fn from_pair(latitude: Option<f64>, longitude: Option<f64>) -> AppResult<Option<Self>> {
        match (latitude, longitude) {
            (None, None) => Ok(None),
            (Some(latitude), Some(longitude)) => {
                let point = Self::new(latitude, longitude);
                point.validate()?;
                Ok(Some(point))
            }
            _ => Err(AppError::ValidationError(
                "latitude and longitude must be provided together".to_string(),
            )),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AppError::ValidationError(format!(
                "latitude {} is out of range [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AppError::ValidationError(format!(
                "longitude {} is out of range [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// Great-circle distance between two points in kilometres (haversine).
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos()
            * to.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Distance when both ends are known. A missing point means "unknown",
/// which is not the same as zero.
pub fn distance_km(from: Option<Coordinates>, to: Option<Coordinates>) -> Option<f64> {
    Some(haversine_km(from?, to?))
}
