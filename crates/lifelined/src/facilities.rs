//! Nearby medical facility lookup via the OpenStreetMap Overpass API.

use async_trait::async_trait;
use lifeline_shared::places::format_distance;
use lifeline_shared::{FacilityType, Location, NearbyPlace, NearbyPlaces, Ownership, PlaceCategory};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::FacilitiesConfig;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookupError {
    #[error("Facility lookup is disabled")]
    Disabled,

    #[error("Overpass request failed: {0}")]
    Http(String),

    #[error("Overpass returned HTTP {0}")]
    Status(u16),

    #[error("Invalid Overpass response: {0}")]
    InvalidResponse(String),

    #[error("Overpass timeout after {0} seconds")]
    Timeout(u64),
}

impl LookupError {
    pub fn code(&self) -> i32 {
        match self {
            LookupError::Disabled => -32040,
            LookupError::Http(_) => -32041,
            LookupError::Status(_) => -32042,
            LookupError::InvalidResponse(_) => -32043,
            LookupError::Timeout(_) => -32044,
        }
    }
}

/// Finds hospitals, pharmacies and medical stores around a location
#[async_trait]
pub trait FacilityLookup: Send + Sync {
    async fn find_nearby(&self, location: &Location) -> Result<NearbyPlaces, LookupError>;
}

/// Tag filters sent to Overpass, each queried as node and way
const TAG_FILTERS: &[(&str, &str)] = &[
    ("amenity", "hospital"),
    ("amenity", "clinic"),
    ("healthcare", "hospital"),
    ("healthcare", "clinic"),
    ("amenity", "pharmacy"),
    ("shop", "chemist"),
    ("healthcare", "pharmacy"),
    ("shop", "medical_supply"),
];

const GOVERNMENT_NAME_HINTS: &[&str] = &[
    "government",
    "govt",
    "district",
    "area hospital",
    "phc",
    "chc",
    "taluk",
];

pub const ADDRESS_NOT_AVAILABLE: &str = "Address not available";

/// Overpass QL for all medical facilities within `radius_meters`
pub fn build_query(location: &Location, radius_meters: u32) -> String {
    let around = format!(
        "(around:{},{},{})",
        radius_meters, location.latitude, location.longitude
    );
    let mut query = String::from("[out:json][timeout:25];\n(\n");
    for (key, value) in TAG_FILTERS {
        for kind in ["node", "way"] {
            query.push_str(&format!("  {}[\"{}\"=\"{}\"]{};\n", kind, key, value, around));
        }
    }
    query.push_str(");\nout center;\n");
    query
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    center: Option<Center>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Center {
    lat: f64,
    lon: f64,
}

impl OverpassElement {
    /// Ways carry a center, nodes carry lat/lon
    fn coordinates(&self) -> Option<(f64, f64)> {
        match (&self.center, self.lat, self.lon) {
            (Some(c), _, _) => Some((c.lat, c.lon)),
            (None, Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    fn lower_tag(&self, key: &str) -> String {
        self.tag(key).unwrap_or_default().to_lowercase()
    }
}

struct Kind {
    hospital: bool,
    clinic: bool,
    pharmacy: bool,
    medical_store: bool,
}

impl Kind {
    fn of(element: &OverpassElement) -> Self {
        let amenity = element.tag("amenity");
        let healthcare = element.tag("healthcare");
        let shop = element.tag("shop");
        Self {
            hospital: amenity == Some("hospital") || healthcare == Some("hospital"),
            clinic: amenity == Some("clinic") || healthcare == Some("clinic"),
            pharmacy: amenity == Some("pharmacy") || healthcare == Some("pharmacy"),
            medical_store: shop == Some("chemist") || shop == Some("medical_supply"),
        }
    }

    /// Pharmacy wins over medical store, which wins over hospital/clinic
    fn category(&self) -> Option<PlaceCategory> {
        if self.pharmacy {
            Some(PlaceCategory::Pharmacy)
        } else if self.medical_store {
            Some(PlaceCategory::MedicalStore)
        } else if self.hospital || self.clinic {
            Some(PlaceCategory::Hospital)
        } else {
            None
        }
    }

    fn facility_type(&self) -> Option<FacilityType> {
        if self.clinic {
            Some(FacilityType::Clinic)
        } else if self.hospital {
            Some(FacilityType::Hospital)
        } else {
            None
        }
    }
}

fn infer_ownership(element: &OverpassElement) -> Ownership {
    let operator = element.lower_tag("operator");
    let operator_type = element.lower_tag("operator:type");
    let name = element.lower_tag("name");

    if operator_type.contains("government")
        || operator_type.contains("public")
        || operator.contains("government")
        || operator.contains("govt")
        || GOVERNMENT_NAME_HINTS.iter().any(|h| name.contains(h))
    {
        Ownership::Government
    } else if operator_type.contains("private")
        || operator.contains("private")
        || name.contains("private")
    {
        Ownership::Private
    } else {
        Ownership::Unknown
    }
}

fn build_address(element: &OverpassElement) -> String {
    let parts: Vec<&str> = ["addr:housenumber", "addr:street", "addr:city", "addr:postcode"]
        .iter()
        .filter_map(|k| element.tag(k))
        .collect();

    if !parts.is_empty() {
        return parts.join(", ");
    }
    element
        .tag("address")
        .unwrap_or(ADDRESS_NOT_AVAILABLE)
        .to_string()
}

fn default_name(kind: &Kind, element: &OverpassElement) -> &'static str {
    if kind.pharmacy {
        "Pharmacy"
    } else if kind.medical_store {
        if element.tag("shop") == Some("chemist") {
            "Chemist"
        } else {
            "Medical Store"
        }
    } else if kind.clinic {
        "Clinic"
    } else {
        "Hospital"
    }
}

/// Parse an Overpass JSON body into places around `origin`
pub fn parse_overpass(body: &str, origin: &Location, per_category: usize) -> Result<NearbyPlaces, LookupError> {
    let response: OverpassResponse = serde_json::from_str(body)
        .map_err(|e| LookupError::InvalidResponse(e.to_string()))?;

    let mut places = NearbyPlaces::default();
    let mut seen = HashSet::new();
    let total = response.elements.len();

    for element in &response.elements {
        let Some((lat, lon)) = element.coordinates() else {
            continue;
        };

        let kind = Kind::of(element);
        let Some(category) = kind.category() else {
            continue;
        };

        // Same facility is often tagged several ways
        let key = (category, format!("{:.5}_{:.5}", lat, lon));
        if !seen.insert(key) {
            continue;
        }

        let is_facility = kind.hospital || kind.clinic;
        let meters = origin.distance_to(lat, lon);
        places.push(NearbyPlace {
            name: element
                .tag("name")
                .unwrap_or_else(|| default_name(&kind, element))
                .to_string(),
            address: build_address(element),
            distance: format_distance(meters),
            distance_meters: meters,
            latitude: lat,
            longitude: lon,
            category,
            ownership: is_facility.then(|| infer_ownership(element)),
            facility_type: kind.facility_type(),
            phone: element
                .tag("phone")
                .or_else(|| element.tag("contact:phone"))
                .map(str::to_string),
            website: element
                .tag("website")
                .or_else(|| element.tag("contact:website"))
                .map(str::to_string),
            opening_hours: element.tag("opening_hours").map(str::to_string),
        });
    }

    places.sort_and_limit(per_category);
    debug!("Overpass: {} elements -> {} places", total, places.total());
    Ok(places)
}

/// Overpass-backed lookup
pub struct OverpassLookup {
    config: FacilitiesConfig,
    client: reqwest::Client,
}

impl OverpassLookup {
    pub fn new(config: FacilitiesConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl FacilityLookup for OverpassLookup {
    async fn find_nearby(&self, location: &Location) -> Result<NearbyPlaces, LookupError> {
        if !self.config.enabled {
            return Err(LookupError::Disabled);
        }

        let query = build_query(location, self.config.radius_meters);
        let response = self
            .client
            .post(&self.config.overpass_url)
            .form(&[("data", query.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LookupError::Timeout(self.config.timeout_secs)
                } else {
                    LookupError::Http(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LookupError::Http(e.to_string()))?;
        let places = parse_overpass(&body, location, self.config.per_category)?;

        info!(
            "Found {} hospitals/clinics, {} pharmacies, {} medical stores",
            places.hospitals.len(),
            places.pharmacies.len(),
            places.medical_stores.len()
        );
        Ok(places)
    }
}
