//! Guidance results and the rules for replacing local guidance with an
//! enhanced one.
//!
//! A published result is superseded, never edited: merging builds a new
//! `GuidanceResult` from the local and enhanced ones.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LifelineError;

/// Severity of the situation. Ordered `Moderate < Urgent < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Moderate,
    Urgent,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Moderate => "moderate",
            Priority::Urgent => "urgent",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = LifelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "moderate" => Ok(Priority::Moderate),
            "urgent" => Ok(Priority::Urgent),
            "critical" => Ok(Priority::Critical),
            other => Err(LifelineError::UnknownPriority(other.to_string())),
        }
    }
}

/// Instructions, CPR flag and priority for one assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidanceResult {
    pub instructions: Vec<String>,
    #[serde(rename = "showCPR")]
    pub show_cpr: bool,
    pub priority: Priority,
}

impl GuidanceResult {
    /// Position of the first step telling the bystander to call for help
    pub fn emergency_call_step(&self) -> Option<usize> {
        self.instructions.iter().position(|s| is_emergency_call_step(s))
    }

    pub fn mentions_cpr(&self) -> bool {
        self.instructions
            .iter()
            .any(|s| s.to_lowercase().contains("cpr"))
    }
}

/// True when an instruction asks the bystander to phone emergency services
pub fn is_emergency_call_step(step: &str) -> bool {
    let s = step.to_lowercase();
    ["call", "dial", "phone"].iter().any(|w| s.contains(w))
        && (s.contains("ambulance")
            || s.contains("emergency")
            || s.chars().any(|c| c.is_ascii_digit()))
}

/// Where the displayed result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuidanceSource {
    Local,
    Enhanced,
}

/// Why an enhanced result was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    AlreadyEnhanced,
    NoInstructions,
}

/// The guidance currently shown for a completed assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceState {
    pub result: GuidanceResult,
    pub source: GuidanceSource,
    pub is_enhancing: bool,
}

impl GuidanceState {
    /// Phase 1 state. `enhancing` is true only when an enhancement will run.
    pub fn local(result: GuidanceResult, enhancing: bool) -> Self {
        Self {
            result,
            source: GuidanceSource::Local,
            is_enhancing: enhancing,
        }
    }

    /// Replace the local result with a merge of it and `enhanced`.
    ///
    /// Settles the enhancement whether or not the result is applied.
    pub fn apply_enhancement(&mut self, enhanced: GuidanceResult) -> MergeOutcome {
        self.is_enhancing = false;
        if self.source == GuidanceSource::Enhanced {
            return MergeOutcome::AlreadyEnhanced;
        }
        match merge_guidance(&self.result, enhanced) {
            Some(merged) => {
                self.result = merged;
                self.source = GuidanceSource::Enhanced;
                MergeOutcome::Applied
            }
            None => MergeOutcome::NoInstructions,
        }
    }

    /// Enhancement failed or was abandoned; keep the current result.
    pub fn settle(&mut self) {
        self.is_enhancing = false;
    }
}

/// Merge an enhanced result over a local one without weakening it.
///
/// - the CPR flag is OR-ed, a remote source never clears it
/// - priority is the higher of the two
/// - blank instructions are dropped; nothing left means no merge
/// - a missing emergency-call step is restored from the local result
pub fn merge_guidance(local: &GuidanceResult, enhanced: GuidanceResult) -> Option<GuidanceResult> {
    let mut instructions: Vec<String> = enhanced
        .instructions
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if instructions.is_empty() {
        return None;
    }

    let call_near_top = instructions
        .iter()
        .take(2)
        .any(|s| is_emergency_call_step(s));
    if !call_near_top {
        if let Some(idx) = local.emergency_call_step() {
            instructions.insert(0, local.instructions[idx].clone());
        }
    }

    Some(GuidanceResult {
        instructions,
        show_cpr: local.show_cpr || enhanced.show_cpr,
        priority: local.priority.max(enhanced.priority),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(steps: &[&str], show_cpr: bool, priority: Priority) -> GuidanceResult {
        GuidanceResult {
            instructions: steps.iter().map(|s| s.to_string()).collect(),
            show_cpr,
            priority,
        }
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical > Priority::Urgent);
        assert!(Priority::Urgent > Priority::Moderate);
        assert_eq!(Priority::Moderate.max(Priority::Critical), Priority::Critical);
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("Critical".parse::<Priority>().unwrap(), Priority::Critical);
        assert_eq!(" urgent ".parse::<Priority>().unwrap(), Priority::Urgent);
        assert!("severe".parse::<Priority>().is_err());
    }

    #[test]
    fn test_wire_names() {
        let r = result(&["Call 108"], true, Priority::Critical);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["showCPR"], true);
        assert_eq!(json["priority"], "critical");

        let state = GuidanceState::local(r, true);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["source"], "local");
        assert_eq!(json["isEnhancing"], true);
    }

    #[test]
    fn test_merge_keeps_cpr_flag() {
        let local = result(&["Call 108 for ambulance IMMEDIATELY"], true, Priority::Critical);
        let remote = result(&["Call emergency services (108) now", "Start CPR"], false, Priority::Critical);
        let merged = merge_guidance(&local, remote).unwrap();
        assert!(merged.show_cpr);
    }

    #[test]
    fn test_merge_never_lowers_priority() {
        let local = result(&["Call 108 for ambulance"], false, Priority::Urgent);
        let remote = result(&["Call 108", "Stay calm"], false, Priority::Moderate);
        let merged = merge_guidance(&local, remote).unwrap();
        assert_eq!(merged.priority, Priority::Urgent);
    }

    #[test]
    fn test_merge_rejects_blank_instructions() {
        let local = result(&["Call 108"], false, Priority::Moderate);
        let remote = result(&["", "   "], false, Priority::Moderate);
        assert!(merge_guidance(&local, remote).is_none());
    }

    #[test]
    fn test_merge_restores_call_step() {
        let local = result(&["Call 108 for ambulance", "Keep still"], false, Priority::Moderate);
        let remote = result(&["Keep the person warm", "Check for injuries", "Stay nearby"], false, Priority::Moderate);
        let merged = merge_guidance(&local, remote).unwrap();
        assert_eq!(merged.instructions[0], "Call 108 for ambulance");
        assert_eq!(merged.instructions.len(), 4);
    }

    #[test]
    fn test_merge_accepts_dial_wording() {
        assert!(is_emergency_call_step("Dial 108 for an ambulance"));
        assert!(is_emergency_call_step("Phone emergency services now"));
        assert!(!is_emergency_call_step("Keep your phone nearby"));

        let local = result(&["Call 108 for ambulance", "Keep still"], false, Priority::Moderate);
        let remote = result(&["Dial 108 for an ambulance", "Keep the person warm"], false, Priority::Moderate);
        let merged = merge_guidance(&local, remote).unwrap();
        assert_eq!(merged.instructions.len(), 2);
        assert_eq!(merged.instructions[0], "Dial 108 for an ambulance");
    }

    #[test]
    fn test_apply_enhancement_once() {
        let mut state = GuidanceState::local(result(&["Call 108"], false, Priority::Moderate), true);
        let outcome = state.apply_enhancement(result(&["Call 108 now", "Rest"], false, Priority::Moderate));
        assert_eq!(outcome, MergeOutcome::Applied);
        assert_eq!(state.source, GuidanceSource::Enhanced);
        assert!(!state.is_enhancing);

        let again = state.apply_enhancement(result(&["Call 112"], false, Priority::Moderate));
        assert_eq!(again, MergeOutcome::AlreadyEnhanced);
        assert_eq!(state.result.instructions[0], "Call 108 now");
    }

    #[test]
    fn test_rejected_enhancement_settles() {
        let mut state = GuidanceState::local(result(&["Call 108"], false, Priority::Moderate), true);
        let outcome = state.apply_enhancement(result(&[], false, Priority::Critical));
        assert_eq!(outcome, MergeOutcome::NoInstructions);
        assert_eq!(state.source, GuidanceSource::Local);
        assert!(!state.is_enhancing);
    }
}
