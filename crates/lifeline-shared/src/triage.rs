//! Triage engine: maps a completed assessment to first-aid guidance.
//!
//! Rules are checked in severity order and the first match wins:
//!
//! 1. unconscious and not breathing -> critical, CPR
//! 2. unconscious                   -> urgent
//! 3. heavy bleeding                -> urgent
//! 4. otherwise                     -> moderate
//!
//! No I/O. The same assessment always yields the same result.

use crate::assessment::{Assessment, CompleteAssessment};
use crate::contacts::EmergencyContacts;
use crate::error::Result;
use crate::guidance::{GuidanceResult, Priority};

/// Which rule matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageRule {
    NotBreathing,
    Unconscious,
    HeavyBleeding,
    Stable,
}

impl TriageRule {
    pub fn classify(a: &CompleteAssessment) -> Self {
        if !a.is_conscious && !a.is_breathing {
            TriageRule::NotBreathing
        } else if !a.is_conscious {
            TriageRule::Unconscious
        } else if a.has_heavy_bleeding {
            TriageRule::HeavyBleeding
        } else {
            TriageRule::Stable
        }
    }

    pub fn priority(self) -> Priority {
        match self {
            TriageRule::NotBreathing => Priority::Critical,
            TriageRule::Unconscious | TriageRule::HeavyBleeding => Priority::Urgent,
            TriageRule::Stable => Priority::Moderate,
        }
    }

    pub fn show_cpr(self) -> bool {
        self == TriageRule::NotBreathing
    }
}

/// Produces guidance naming the configured emergency numbers.
#[derive(Debug, Clone, Default)]
pub struct TriageEngine {
    contacts: EmergencyContacts,
}

impl TriageEngine {
    pub fn new(contacts: EmergencyContacts) -> Self {
        Self { contacts }
    }

    pub fn contacts(&self) -> &EmergencyContacts {
        &self.contacts
    }

    pub fn compute(&self, assessment: &CompleteAssessment) -> GuidanceResult {
        let rule = TriageRule::classify(assessment);
        GuidanceResult {
            instructions: self.instructions(rule),
            show_cpr: rule.show_cpr(),
            priority: rule.priority(),
        }
    }

    /// Checked entry for callers holding a possibly partial assessment
    pub fn compute_for(&self, assessment: &Assessment) -> Result<GuidanceResult> {
        Ok(self.compute(&assessment.complete()?))
    }

    fn instructions(&self, rule: TriageRule) -> Vec<String> {
        let amb = &self.contacts.ambulance;
        match rule {
            TriageRule::NotBreathing => vec![
                format!("Call {} for ambulance IMMEDIATELY", amb),
                "Check airway - tilt head back, lift chin".to_string(),
                "Begin CPR if trained - 30 chest compressions".to_string(),
                "Give 2 rescue breaths after compressions".to_string(),
                "Continue CPR until help arrives".to_string(),
            ],
            TriageRule::Unconscious => vec![
                format!("Call {} for ambulance immediately", amb),
                "Place person in recovery position (on their side)".to_string(),
                "Keep airway clear and monitor breathing".to_string(),
                "Do NOT move them unless in danger".to_string(),
                "Stay with them until help arrives".to_string(),
            ],
            TriageRule::HeavyBleeding => vec![
                format!("Call {} for ambulance", amb),
                "Apply firm pressure to the wound with clean cloth".to_string(),
                "Keep pressing - do not remove the cloth".to_string(),
                "If blood soaks through, add more cloth on top".to_string(),
                "Keep the injured area raised if possible".to_string(),
            ],
            TriageRule::Stable => vec![
                format!("Call {} if medical help is needed", amb),
                "Keep the person calm and still".to_string(),
                "Do NOT move them unless in immediate danger".to_string(),
                "Check for any other injuries".to_string(),
                "Stay with them until help arrives".to_string(),
            ],
        }
    }

    /// General guide for when no assessment is available
    pub fn offline_guide(&self) -> GuidanceResult {
        GuidanceResult {
            instructions: vec![
                "Ensure the scene is safe before approaching the victim".to_string(),
                format!(
                    "Call emergency services ({} for ambulance, {} for police) immediately",
                    self.contacts.ambulance, self.contacts.police
                ),
                "If conscious, keep the victim calm and still - do not move them unless necessary"
                    .to_string(),
                "Apply direct pressure to any visible bleeding using a clean cloth".to_string(),
                "Keep the victim warm with a blanket or jacket".to_string(),
                "Stay with the victim until help arrives and monitor their breathing".to_string(),
            ],
            show_cpr: false,
            priority: Priority::Urgent,
        }
    }
}

/// Guidance with the default emergency numbers
pub fn compute_guidance(assessment: &CompleteAssessment) -> GuidanceResult {
    TriageEngine::default().compute(assessment)
}

/// Guidance for a possibly partial assessment
pub fn compute_guidance_for(assessment: &Assessment) -> Result<GuidanceResult> {
    TriageEngine::default().compute_for(assessment)
}
