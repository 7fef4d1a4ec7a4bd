//! Bystander assessment of the victim.
//!
//! Three tri-state answers collected one question at a time. `None` means the
//! question has not been answered yet.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LifelineError, Result};

/// The three assessment questions, in the order they are asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Question {
    Conscious,
    Breathing,
    HeavyBleeding,
}

impl Question {
    pub const ALL: [Question; 3] = [
        Question::Conscious,
        Question::Breathing,
        Question::HeavyBleeding,
    ];

    /// Zero-based position in the questionnaire
    pub fn index(self) -> usize {
        match self {
            Question::Conscious => 0,
            Question::Breathing => 1,
            Question::HeavyBleeding => 2,
        }
    }

    pub fn next(self) -> Option<Question> {
        Question::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Question> {
        self.index().checked_sub(1).map(|i| Question::ALL[i])
    }

    /// Prompt shown to the bystander
    pub fn prompt(self) -> &'static str {
        match self {
            Question::Conscious => "Is the person conscious?",
            Question::Breathing => "Is the person breathing normally?",
            Question::HeavyBleeding => "Is there heavy bleeding?",
        }
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Question::Conscious => "conscious",
            Question::Breathing => "breathing",
            Question::HeavyBleeding => "heavy_bleeding",
        };
        write!(f, "{}", s)
    }
}

/// Answers collected so far. Field names match the client payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    #[serde(default)]
    pub is_conscious: Option<bool>,
    #[serde(default)]
    pub is_breathing: Option<bool>,
    #[serde(default)]
    pub has_heavy_bleeding: Option<bool>,
}

impl Assessment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question: Question) -> Option<bool> {
        match question {
            Question::Conscious => self.is_conscious,
            Question::Breathing => self.is_breathing,
            Question::HeavyBleeding => self.has_heavy_bleeding,
        }
    }

    pub(crate) fn set(&mut self, question: Question, value: Option<bool>) {
        match question {
            Question::Conscious => self.is_conscious = value,
            Question::Breathing => self.is_breathing = value,
            Question::HeavyBleeding => self.has_heavy_bleeding = value,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// First question still unanswered, if any
    pub fn first_unanswered(&self) -> Option<Question> {
        Question::ALL.into_iter().find(|q| self.get(*q).is_none())
    }

    pub fn is_complete(&self) -> bool {
        self.first_unanswered().is_none()
    }

    pub fn is_empty(&self) -> bool {
        Question::ALL.into_iter().all(|q| self.get(q).is_none())
    }

    /// Narrow to a complete assessment, failing on the first unknown answer
    pub fn complete(&self) -> Result<CompleteAssessment> {
        CompleteAssessment::try_from(self)
    }
}

/// An assessment with every question answered.
///
/// The triage engine only accepts this type, so calling it on a partial
/// assessment cannot be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteAssessment {
    pub is_conscious: bool,
    pub is_breathing: bool,
    pub has_heavy_bleeding: bool,
}

impl CompleteAssessment {
    pub fn new(is_conscious: bool, is_breathing: bool, has_heavy_bleeding: bool) -> Self {
        Self {
            is_conscious,
            is_breathing,
            has_heavy_bleeding,
        }
    }

    /// Unconscious and not breathing
    pub fn needs_cpr(&self) -> bool {
        !self.is_conscious && !self.is_breathing
    }
}

impl TryFrom<&Assessment> for CompleteAssessment {
    type Error = LifelineError;

    fn try_from(a: &Assessment) -> Result<Self> {
        let answered = |q: Question| a.get(q).ok_or(LifelineError::IncompleteAssessment(q));
        Ok(Self {
            is_conscious: answered(Question::Conscious)?,
            is_breathing: answered(Question::Breathing)?,
            has_heavy_bleeding: answered(Question::HeavyBleeding)?,
        })
    }
}

impl From<CompleteAssessment> for Assessment {
    fn from(c: CompleteAssessment) -> Self {
        Self {
            is_conscious: Some(c.is_conscious),
            is_breathing: Some(c.is_breathing),
            has_heavy_bleeding: Some(c.has_heavy_bleeding),
        }
    }
}
