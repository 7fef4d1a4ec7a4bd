//! Audit records for logged emergencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessment::{Assessment, CompleteAssessment};
use crate::places::Location;

pub const DEFAULT_EMERGENCY_TYPE: &str = "road_accident";

fn default_emergency_type() -> String {
    DEFAULT_EMERGENCY_TYPE.to_string()
}

/// Emergency as submitted, before an id and timestamp are assigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmergency {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default = "default_emergency_type")]
    pub emergency_type: String,
    #[serde(flatten)]
    pub assessment: Assessment,
}

impl NewEmergency {
    pub fn from_assessment(assessment: &CompleteAssessment, location: Option<&Location>) -> Self {
        Self {
            latitude: location.map(|l| l.latitude),
            longitude: location.map(|l| l.longitude),
            emergency_type: default_emergency_type(),
            assessment: (*assessment).into(),
        }
    }
}

/// Stored emergency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub emergency_type: String,
    #[serde(flatten)]
    pub assessment: Assessment,
}

impl EmergencyRecord {
    pub fn new(emergency: NewEmergency) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            latitude: emergency.latitude,
            longitude: emergency.longitude,
            emergency_type: emergency.emergency_type,
            assessment: emergency.assessment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_emergency_from_client_payload() {
        let json = r#"{
            "latitude": 12.97,
            "longitude": 77.59,
            "isConscious": false,
            "isBreathing": true,
            "hasHeavyBleeding": null
        }"#;
        let e: NewEmergency = serde_json::from_str(json).unwrap();
        assert_eq!(e.emergency_type, "road_accident");
        assert_eq!(e.assessment.is_conscious, Some(false));
        assert_eq!(e.assessment.has_heavy_bleeding, None);
    }

    #[test]
    fn test_record_without_location() {
        let c = CompleteAssessment::new(true, true, false);
        let record = EmergencyRecord::new(NewEmergency::from_assessment(&c, None));
        assert!(record.latitude.is_none());
        assert_eq!(record.assessment.is_breathing, Some(true));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["emergencyType"], "road_accident");
        assert_eq!(json["isConscious"], true);
    }
}
