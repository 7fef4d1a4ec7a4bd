//! Assessment session state machine.
//!
//! `Idle -> AskingConscious -> AskingBreathing -> AskingBleeding -> Complete`
//!
//! Each answer fills one field and advances one step. `back` undoes the last
//! answer. The generation counter changes whenever a published result is
//! abandoned (restart, start, back from Complete) so late asynchronous
//! results can be recognized and dropped.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::assessment::{Assessment, CompleteAssessment, Question};
use crate::error::{LifelineError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    Idle,
    AskingConscious,
    AskingBreathing,
    AskingBleeding,
    Complete,
}

impl Step {
    pub fn asking(question: Question) -> Self {
        match question {
            Question::Conscious => Step::AskingConscious,
            Question::Breathing => Step::AskingBreathing,
            Question::HeavyBleeding => Step::AskingBleeding,
        }
    }

    /// Question awaiting an answer in this step
    pub fn question(self) -> Option<Question> {
        match self {
            Step::AskingConscious => Some(Question::Conscious),
            Step::AskingBreathing => Some(Question::Breathing),
            Step::AskingBleeding => Some(Question::HeavyBleeding),
            Step::Idle | Step::Complete => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::Idle => "idle",
            Step::AskingConscious => "asking conscious",
            Step::AskingBreathing => "asking breathing",
            Step::AskingBleeding => "asking heavy bleeding",
            Step::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// Monotonic tag identifying the current round of guidance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Result of a successful answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Waiting for the given question
    Asking(Question),
    /// Third answer recorded; guidance should be produced now
    Completed(CompleteAssessment),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssessmentSession {
    step: Step,
    assessment: Assessment,
    generation: Generation,
}

impl AssessmentSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn assessment(&self) -> &Assessment {
        &self.assessment
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Completed assessment, only in the Complete step
    pub fn completed(&self) -> Option<CompleteAssessment> {
        match self.step {
            Step::Complete => self.assessment.complete().ok(),
            _ => None,
        }
    }

    /// Fresh assessment, first question
    pub fn start(&mut self) {
        self.restart();
        self.step = Step::AskingConscious;
    }

    /// Back to Idle with nothing answered
    pub fn restart(&mut self) {
        self.assessment.reset();
        self.step = Step::Idle;
        self.generation = self.generation.next();
    }

    /// Record the answer to the current question.
    ///
    /// Answering from Idle starts the questionnaire first.
    pub fn answer(&mut self, question: Question, value: bool) -> Result<Transition> {
        let current = match self.step {
            Step::Idle => Step::AskingConscious,
            step => step,
        };

        if current.question() != Some(question) {
            return Err(LifelineError::InvalidTransition {
                step: self.step,
                question,
            });
        }

        self.assessment.set(question, Some(value));

        match question.next() {
            Some(next) => {
                self.step = Step::asking(next);
                Ok(Transition::Asking(next))
            }
            None => {
                self.step = Step::Complete;
                let completed = self.assessment.complete()?;
                Ok(Transition::Completed(completed))
            }
        }
    }

    /// Undo one step. Returns the new step.
    pub fn back(&mut self) -> Step {
        self.step = match self.step {
            Step::Idle => Step::Idle,
            Step::AskingConscious => {
                self.assessment.reset();
                Step::Idle
            }
            Step::AskingBreathing => {
                self.assessment.set(Question::Conscious, None);
                Step::AskingConscious
            }
            Step::AskingBleeding => {
                self.assessment.set(Question::Breathing, None);
                Step::AskingBreathing
            }
            Step::Complete => {
                self.assessment.set(Question::HeavyBleeding, None);
                self.generation = self.generation.next();
                Step::AskingBleeding
            }
        };
        self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_out_of_order_rejected() {
        let mut s = AssessmentSession::new();
        s.start();
        let err = s.answer(Question::Breathing, true).unwrap_err();
        assert_eq!(
            err,
            LifelineError::InvalidTransition {
                step: Step::AskingConscious,
                question: Question::Breathing,
            }
        );
        assert!(s.assessment().is_empty());
    }

    #[test]
    fn test_rejected_answer_from_idle_stays_idle() {
        let mut s = AssessmentSession::new();
        assert!(s.answer(Question::HeavyBleeding, true).is_err());
        assert_eq!(s.step(), Step::Idle);
    }

    #[test]
    fn test_answer_after_complete_rejected() {
        let mut s = AssessmentSession::new();
        s.answer(Question::Conscious, true).unwrap();
        s.answer(Question::Breathing, true).unwrap();
        s.answer(Question::HeavyBleeding, true).unwrap();
        assert!(s.answer(Question::HeavyBleeding, false).is_err());
        assert_eq!(s.assessment().has_heavy_bleeding, Some(true));
    }

    #[test]
    fn test_back_walks_to_idle() {
        let mut s = AssessmentSession::new();
        s.answer(Question::Conscious, false).unwrap();
        s.answer(Question::Breathing, true).unwrap();

        assert_eq!(s.back(), Step::AskingBreathing);
        assert_eq!(s.assessment().is_breathing, None);
        assert_eq!(s.assessment().is_conscious, Some(false));

        assert_eq!(s.back(), Step::AskingConscious);
        assert!(s.assessment().is_empty());

        assert_eq!(s.back(), Step::Idle);
        assert_eq!(s.back(), Step::Idle);
    }

    #[test]
    fn test_generation_changes() {
        let mut s = AssessmentSession::new();
        let g0 = s.generation();

        s.answer(Question::Conscious, true).unwrap();
        assert_eq!(s.generation(), g0);

        s.restart();
        let g1 = s.generation();
        assert!(g1 > g0);

        s.start();
        assert!(s.generation() > g1);
    }

    #[test]
    fn test_back_from_complete_bumps_generation() {
        let mut s = AssessmentSession::new();
        s.answer(Question::Conscious, true).unwrap();
        s.answer(Question::Breathing, true).unwrap();
        s.answer(Question::HeavyBleeding, false).unwrap();
        let g = s.generation();
        s.back();
        assert!(s.generation() > g);
        assert!(s.completed().is_none());
    }
}
