//! Location and nearby medical facility types.

use serde::{Deserialize, Serialize};

use crate::error::{LifelineError, Result};

/// Mean earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Default number of places kept per category
pub const DEFAULT_PLACES_PER_CATEGORY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters
    #[serde(default)]
    pub accuracy: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Result<Self> {
        let loc = Self {
            latitude,
            longitude,
            accuracy,
        };
        loc.validate()?;
        Ok(loc)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(LifelineError::InvalidCoordinates(format!(
                "latitude {} out of range",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(LifelineError::InvalidCoordinates(format!(
                "longitude {} out of range",
                self.longitude
            )));
        }
        Ok(())
    }

    /// "lat,lng" as used in map URLs
    pub fn coords(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }

    pub fn distance_to(&self, latitude: f64, longitude: f64) -> f64 {
        haversine_meters(self.latitude, self.longitude, latitude, longitude)
    }
}

/// Great-circle distance between two points in meters
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// "850 m" below one kilometer, "1.2 km" above
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{} m", meters.round() as i64)
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceCategory {
    Hospital,
    Pharmacy,
    MedicalStore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ownership {
    Government,
    Private,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacilityType {
    Hospital,
    Clinic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyPlace {
    pub name: String,
    pub address: String,
    /// Human readable, e.g. "1.2 km"
    pub distance: String,
    pub distance_meters: f64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "type")]
    pub category: PlaceCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership: Option<Ownership>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility_type: Option<FacilityType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
}

/// Places grouped by category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyPlaces {
    pub hospitals: Vec<NearbyPlace>,
    pub pharmacies: Vec<NearbyPlace>,
    pub medical_stores: Vec<NearbyPlace>,
}

impl NearbyPlaces {
    pub fn push(&mut self, place: NearbyPlace) {
        match place.category {
            PlaceCategory::Hospital => self.hospitals.push(place),
            PlaceCategory::Pharmacy => self.pharmacies.push(place),
            PlaceCategory::MedicalStore => self.medical_stores.push(place),
        }
    }

    /// Sort each category nearest first and keep at most `limit`
    pub fn sort_and_limit(&mut self, limit: usize) {
        for list in [
            &mut self.hospitals,
            &mut self.pharmacies,
            &mut self.medical_stores,
        ] {
            list.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
            list.truncate(limit);
        }
    }

    pub fn total(&self) -> usize {
        self.hospitals.len() + self.pharmacies.len() + self.medical_stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Facility search state as seen by the bystander.
///
/// `Failed` is kept apart from `Searching` so the UI can offer a retry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FacilityStatus {
    #[default]
    NoLocation,
    Disabled,
    Searching,
    Found {
        places: NearbyPlaces,
    },
    Failed {
        message: String,
    },
}

impl FacilityStatus {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FacilityStatus::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(name: &str, category: PlaceCategory, meters: f64) -> NearbyPlace {
        NearbyPlace {
            name: name.to_string(),
            address: "Address not available".to_string(),
            distance: format_distance(meters),
            distance_meters: meters,
            latitude: 0.0,
            longitude: 0.0,
            category,
            ownership: None,
            facility_type: None,
            phone: None,
            website: None,
            opening_hours: None,
        }
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.4), "0 m");
        assert_eq!(format_distance(849.6), "850 m");
        assert_eq!(format_distance(1000.0), "1.0 km");
        assert_eq!(format_distance(2345.0), "2.3 km");
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude is about 111.2 km
        let d = haversine_meters(12.0, 77.0, 13.0, 77.0);
        assert!((d - 111_195.0).abs() < 100.0, "got {}", d);
        assert_eq!(haversine_meters(12.9, 77.5, 12.9, 77.5), 0.0);
    }

    #[test]
    fn test_location_validation() {
        assert!(Location::new(12.97, 77.59, 10.0).is_ok());
        assert!(Location::new(91.0, 0.0, 0.0).is_err());
        assert!(Location::new(0.0, -181.0, 0.0).is_err());
        assert!(Location::new(f64::NAN, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_sort_and_limit() {
        let mut places = NearbyPlaces::default();
        places.push(place("far", PlaceCategory::Hospital, 3000.0));
        places.push(place("near", PlaceCategory::Hospital, 200.0));
        places.push(place("mid", PlaceCategory::Hospital, 900.0));
        places.push(place("chemist", PlaceCategory::MedicalStore, 50.0));

        places.sort_and_limit(2);
        let names: Vec<_> = places.hospitals.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["near", "mid"]);
        assert_eq!(places.medical_stores.len(), 1);
        assert_eq!(places.total(), 3);
    }

    #[test]
    fn test_facility_status_wire_format() {
        let json = serde_json::to_value(FacilityStatus::Failed {
            message: "timeout".to_string(),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["message"], "timeout");
        assert!(FacilityStatus::Failed { message: String::new() }.is_retryable());
        assert!(!FacilityStatus::Searching.is_retryable());
    }
}
