//! Emergency phone numbers used in instructions and call shortcuts.

use serde::{Deserialize, Serialize};

pub const DEFAULT_AMBULANCE: &str = "108";
pub const DEFAULT_POLICE: &str = "112";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContacts {
    #[serde(default = "default_ambulance")]
    pub ambulance: String,
    #[serde(default = "default_police")]
    pub police: String,
}

fn default_ambulance() -> String {
    DEFAULT_AMBULANCE.to_string()
}

fn default_police() -> String {
    DEFAULT_POLICE.to_string()
}

impl Default for EmergencyContacts {
    fn default() -> Self {
        Self {
            ambulance: default_ambulance(),
            police: default_police(),
        }
    }
}
