//! Call, map and message links for the results screen.

use lifeline_shared::{EmergencyContacts, Location, NearbyPlace, NearbyPlaces, PlaceCategory};
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const LOCATION_UNAVAILABLE: &str = "Location unavailable";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDirections {
    pub name: String,
    #[serde(rename = "type")]
    pub category: PlaceCategory,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLinks {
    pub call_ambulance: String,
    pub call_police: String,
    /// Map pin for the bystander, when located
    pub maps: Option<String>,
    pub whatsapp: String,
    pub sms: String,
    pub directions: Vec<PlaceDirections>,
}

impl ShareLinks {
    pub fn build(
        contacts: &EmergencyContacts,
        location: Option<&Location>,
        places: Option<&NearbyPlaces>,
    ) -> Self {
        let maps = location.map(maps_link);
        let location_text = maps.as_deref().unwrap_or(LOCATION_UNAVAILABLE);

        let whatsapp = with_query(
            "https://wa.me/",
            "text",
            &format!(
                "EMERGENCY! I am at an accident site. My location: {}. Need help!",
                location_text
            ),
        );
        let sms = with_query(
            "sms:",
            "body",
            &format!(
                "EMERGENCY! Accident site. Location: {}. Need help!",
                location_text
            ),
        );

        let directions = places
            .map(|p| {
                p.hospitals
                    .iter()
                    .chain(&p.pharmacies)
                    .chain(&p.medical_stores)
                    .map(|place| PlaceDirections {
                        name: place.name.clone(),
                        category: place.category,
                        url: directions_link(location, place),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            call_ambulance: tel_link(&contacts.ambulance),
            call_police: tel_link(&contacts.police),
            maps,
            whatsapp,
            sms,
            directions,
        }
    }
}

pub fn tel_link(number: &str) -> String {
    let digits: String = number
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    format!("tel:{}", digits)
}

pub fn maps_link(location: &Location) -> String {
    format!("https://www.google.com/maps?q={}", location.coords())
}

/// Route from the bystander, or a plain search when not located
pub fn directions_link(origin: Option<&Location>, place: &NearbyPlace) -> String {
    let destination = format!("{},{}", place.latitude, place.longitude);
    match origin {
        Some(origin) => format!(
            "https://www.google.com/maps/dir/{}/{}",
            origin.coords(),
            destination
        ),
        None => format!(
            "https://www.google.com/maps/search/?api=1&query={}",
            destination
        ),
    }
}

fn with_query(base: &str, key: &str, value: &str) -> String {
    match Url::parse_with_params(base, &[(key, value)]) {
        Ok(url) => url.to_string(),
        Err(_) => base.to_string(),
    }
}
