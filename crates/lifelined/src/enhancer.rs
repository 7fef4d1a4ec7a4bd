//! AI enhancement of first-aid guidance.
//!
//! Asks an LLM for bystander-level instructions for the same assessment the
//! triage engine already answered. Any failure here is recoverable: callers
//! keep the local guidance.

use async_trait::async_trait;
use lifeline_shared::{CompleteAssessment, EmergencyContacts, GuidanceResult, Priority, TriageRule};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::llm_client::{LlmClient, LlmError};

/// Upper bound on instructions taken from a model response
pub const MAX_INSTRUCTIONS: usize = 8;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnhanceError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Malformed enhancement: {0}")]
    Malformed(String),

    #[error("Enhancement task aborted: {0}")]
    Aborted(String),
}

impl EnhanceError {
    pub fn code(&self) -> i32 {
        match self {
            EnhanceError::Llm(_) => -32020,
            EnhanceError::Malformed(_) => -32021,
            EnhanceError::Aborted(_) => -32022,
        }
    }
}

/// Source of richer guidance for a completed assessment
#[async_trait]
pub trait GuidanceEnhancer: Send + Sync {
    async fn enhance(&self, assessment: &CompleteAssessment) -> Result<GuidanceResult, EnhanceError>;
}

/// Enhancer backed by an LLM
pub struct LlmEnhancer {
    client: Arc<dyn LlmClient>,
    contacts: EmergencyContacts,
}

impl LlmEnhancer {
    pub fn new(client: Arc<dyn LlmClient>, contacts: EmergencyContacts) -> Self {
        Self { client, contacts }
    }
}

#[async_trait]
impl GuidanceEnhancer for LlmEnhancer {
    async fn enhance(&self, assessment: &CompleteAssessment) -> Result<GuidanceResult, EnhanceError> {
        let system = build_system_prompt(&self.contacts);
        let user = build_user_prompt(assessment);
        debug!(
            "Enhancer: asking {} (payload {} bytes)",
            self.client.model(),
            system.len() + user.len()
        );

        let text = self.client.complete(&system, &user).await?;
        let result = parse_enhanced_guidance(&text, assessment)?;

        info!(
            "Enhancer: {} instructions, priority {}",
            result.instructions.len(),
            result.priority
        );
        Ok(result)
    }
}

fn yes_no(v: bool) -> &'static str {
    if v {
        "Yes"
    } else {
        "No"
    }
}

/// Rules for the model
pub fn build_system_prompt(contacts: &EmergencyContacts) -> String {
    format!(
        r#"You are an emergency first aid assistant for road accidents.
Give 4-5 clear, simple first aid instructions a bystander can follow.

RULES:
1. Give ONLY basic first aid steps a non-medical person can do
2. Use very simple, clear language
3. NEVER suggest any medicines or dosages
4. NEVER provide medical diagnosis
5. Each instruction should be one short sentence
6. Always remind to call emergency services ({})

Respond with ONLY a JSON object, no markdown, no code blocks."#,
        contacts.ambulance
    )
}

/// Assessment and expected output shape
pub fn build_user_prompt(assessment: &CompleteAssessment) -> String {
    let rule = TriageRule::classify(assessment);
    let mut prompt = format!(
        "Patient Assessment:\n- Conscious: {}\n- Breathing normally: {}\n- Heavy bleeding: {}\n",
        yes_no(assessment.is_conscious),
        yes_no(assessment.is_breathing),
        yes_no(assessment.has_heavy_bleeding),
    );

    if rule.show_cpr() {
        prompt.push_str(
            "This patient needs CPR - say this is critical but only for trained bystanders.\n",
        );
    }
    if assessment.has_heavy_bleeding {
        prompt.push_str("Focus on controlling bleeding with direct pressure.\n");
    }

    prompt.push_str(&format!(
        "\nFormat: {{\"instructions\": [\"instruction 1\", \"instruction 2\", \"instruction 3\", \"instruction 4\"], \"priority\": \"{}\"}}",
        rule.priority()
    ));
    prompt
}

#[derive(Debug, Deserialize)]
struct EnhancedOutput {
    #[serde(default)]
    instructions: Vec<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default, rename = "showCPR", alias = "show_cpr")]
    show_cpr: Option<bool>,
}

/// Remove a surrounding Markdown code fence, if any
pub fn strip_code_fence(text: &str) -> &str {
    let t = text.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Parse a model response into a guidance result.
///
/// The priority defaults to the triage priority when the model omits it;
/// a missing CPR flag reads as false (the merge restores it when needed).
pub fn parse_enhanced_guidance(
    text: &str,
    assessment: &CompleteAssessment,
) -> Result<GuidanceResult, EnhanceError> {
    let body = strip_code_fence(text);
    let json = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => {
            return Err(EnhanceError::Malformed(
                "response contains no JSON object".to_string(),
            ))
        }
    };

    let output: EnhancedOutput = serde_json::from_str(json)
        .map_err(|e| EnhanceError::Malformed(format!("invalid JSON: {}", e)))?;

    let instructions: Vec<String> = output
        .instructions
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .take(MAX_INSTRUCTIONS)
        .collect();

    if instructions.is_empty() {
        return Err(EnhanceError::Malformed("no instructions".to_string()));
    }

    let priority = match output.priority {
        Some(p) => p
            .parse::<Priority>()
            .map_err(|e| EnhanceError::Malformed(e.to_string()))?,
        None => TriageRule::classify(assessment).priority(),
    };

    Ok(GuidanceResult {
        instructions,
        show_cpr: output.show_cpr.unwrap_or(false),
        priority,
    })
}
