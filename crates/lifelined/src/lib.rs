//! Lifeline daemon library.
//!
//! Async service around the shared triage logic: configuration, the LLM
//! enhancement provider, the emergency log, facility lookup, the guidance
//! merger, per-session services and the HTTP API.

pub mod config;
pub mod emergency_log;
pub mod enhancer;
pub mod facilities;
pub mod llm_client;
pub mod merger;
pub mod registry;
pub mod routes;
pub mod server;
pub mod service;
pub mod share;

pub use config::Config;
pub use emergency_log::{EmergencyLogger, JsonlEmergencyLog, LogError, MemoryEmergencyLog};
pub use enhancer::{EnhanceError, GuidanceEnhancer, LlmEnhancer};
pub use facilities::{FacilityLookup, LookupError, OverpassLookup};
pub use llm_client::{FakeLlmClient, HttpLlmClient, LlmClient, LlmError};
pub use merger::GuidanceMerger;
pub use registry::{RegistryError, SessionRegistry};
pub use server::AppState;
pub use service::{GuidanceService, SessionSnapshot};
pub use share::ShareLinks;
