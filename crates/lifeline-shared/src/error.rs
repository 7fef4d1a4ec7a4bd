//! Error types for Lifeline.

use thiserror::Error;

use crate::assessment::Question;
use crate::session::Step;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifelineError {
    #[error("Assessment is incomplete: {0} not answered")]
    IncompleteAssessment(Question),

    #[error("Cannot answer {question} while {step}")]
    InvalidTransition { step: Step, question: Question },

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Unknown priority: {0}")]
    UnknownPriority(String),
}

impl LifelineError {
    pub fn code(&self) -> i32 {
        match self {
            LifelineError::IncompleteAssessment(_) => -32010,
            LifelineError::InvalidTransition { .. } => -32011,
            LifelineError::InvalidCoordinates(_) => -32012,
            LifelineError::UnknownPriority(_) => -32013,
        }
    }
}

pub type Result<T> = std::result::Result<T, LifelineError>;
