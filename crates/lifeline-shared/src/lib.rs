//! Shared types and decision logic for Lifeline components.
//!
//! Everything here is synchronous and free of I/O: the assessment model, the
//! triage engine, the session state machine, guidance merge rules and the
//! facility/place types consumed by the service.

pub mod assessment;
pub mod contacts;
pub mod emergency;
pub mod error;
pub mod guidance;
pub mod places;
pub mod session;
pub mod triage;

pub use assessment::{Assessment, CompleteAssessment, Question};
pub use contacts::EmergencyContacts;
pub use emergency::{EmergencyRecord, NewEmergency};
pub use error::LifelineError;
pub use guidance::{
    merge_guidance, GuidanceResult, GuidanceSource, GuidanceState, MergeOutcome, Priority,
};
pub use places::{
    FacilityStatus, FacilityType, Location, NearbyPlace, NearbyPlaces, Ownership, PlaceCategory,
};
pub use session::{AssessmentSession, Generation, Step, Transition};
pub use triage::{compute_guidance, compute_guidance_for, TriageEngine, TriageRule};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
