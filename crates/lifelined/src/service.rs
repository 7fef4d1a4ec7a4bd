//! Per-session guidance service.
//!
//! One bystander interaction: the assessment questionnaire, the guidance
//! shown once it completes, the bystander location and the nearby facility
//! search. All of it lives in a single slot behind a tokio `RwLock`; detached
//! tasks write back through the same slot.

use lifeline_shared::{
    Assessment, AssessmentSession, FacilityStatus, Generation, GuidanceState, LifelineError,
    Location, Question, Step, Transition,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::facilities::FacilityLookup;
use crate::merger::GuidanceMerger;
use crate::share::ShareLinks;

/// Mutable state of one session
pub struct SessionSlot {
    pub session: AssessmentSession,
    pub guidance: Option<GuidanceState>,
    pub location: Option<Location>,
    pub facilities: FacilityStatus,
    pub last_activity: Instant,
    /// Bumped on every location change so stale lookups are dropped
    lookup_seq: u64,
    pub(crate) enhancement: Option<JoinHandle<()>>,
    lookup: Option<JoinHandle<()>>,
}

impl SessionSlot {
    fn new(location: Option<Location>) -> Self {
        Self {
            session: AssessmentSession::new(),
            guidance: None,
            location,
            facilities: FacilityStatus::NoLocation,
            last_activity: Instant::now(),
            lookup_seq: 0,
            enhancement: None,
            lookup: None,
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            step: self.session.step(),
            question: self.session.step().question(),
            assessment: *self.session.assessment(),
            guidance: self.guidance.clone(),
            generation: self.session.generation(),
            location: self.location,
            facilities: self.facilities.clone(),
        }
    }
}

pub type SharedSlot = Arc<RwLock<SessionSlot>>;

/// Read-only view of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub step: Step,
    /// Question awaiting an answer, if any
    pub question: Option<Question>,
    pub assessment: Assessment,
    pub guidance: Option<GuidanceState>,
    pub generation: Generation,
    pub location: Option<Location>,
    pub facilities: FacilityStatus,
}

#[derive(Clone)]
pub struct GuidanceService {
    slot: SharedSlot,
    merger: Arc<GuidanceMerger>,
    facilities: Option<Arc<dyn FacilityLookup>>,
}

impl GuidanceService {
    pub fn new(merger: Arc<GuidanceMerger>, facilities: Option<Arc<dyn FacilityLookup>>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(SessionSlot::new(None))),
            merger,
            facilities,
        }
    }

    /// Session that starts with a known location and searches right away
    pub async fn with_location(
        merger: Arc<GuidanceMerger>,
        facilities: Option<Arc<dyn FacilityLookup>>,
        location: Option<Location>,
    ) -> Self {
        let service = Self::new(merger, facilities);
        if location.is_some() {
            service.set_location(location).await;
        }
        service
    }

    /// Fresh questionnaire at the first question
    pub async fn start_assessment(&self) -> SessionSnapshot {
        let mut state = self.slot.write().await;
        state.session.start();
        state.guidance = None;
        state.touch();
        debug!("Assessment started ({})", state.session.generation());
        state.snapshot()
    }

    /// Answer the current question; the third answer publishes guidance
    pub async fn answer(&self, question: Question, value: bool) -> Result<SessionSnapshot, LifelineError> {
        let mut state = self.slot.write().await;
        state.touch();
        let transition = state.session.answer(question, value)?;
        debug!("Answered {}={}", question, value);

        if let Transition::Completed(assessment) = transition {
            self.merger.on_complete(&self.slot, &mut state, assessment);
        }
        Ok(state.snapshot())
    }

    pub async fn back(&self) -> SessionSnapshot {
        let mut state = self.slot.write().await;
        state.touch();
        let step = state.session.back();
        if step != Step::Complete {
            state.guidance = None;
        }
        debug!("Back to {}", step);
        state.snapshot()
    }

    pub async fn restart(&self) -> SessionSnapshot {
        let mut state = self.slot.write().await;
        state.touch();
        state.session.restart();
        state.guidance = None;
        debug!("Session restarted ({})", state.session.generation());
        state.snapshot()
    }

    pub async fn current_state(&self) -> SessionSnapshot {
        self.slot.read().await.snapshot()
    }

    /// Set or clear the bystander location; a new location starts a search
    pub async fn set_location(&self, location: Option<Location>) -> SessionSnapshot {
        let mut state = self.slot.write().await;
        state.touch();
        state.location = location;
        self.begin_lookup(&mut state);
        state.snapshot()
    }

    /// Search again at the current location
    pub async fn refresh_facilities(&self) -> SessionSnapshot {
        let mut state = self.slot.write().await;
        state.touch();
        self.begin_lookup(&mut state);
        state.snapshot()
    }

    pub async fn share_links(&self) -> ShareLinks {
        let state = self.slot.read().await;
        let places = match &state.facilities {
            FacilityStatus::Found { places } => Some(places),
            _ => None,
        };
        ShareLinks::build(
            self.merger.engine().contacts(),
            state.location.as_ref(),
            places,
        )
    }

    pub async fn idle_for(&self) -> Duration {
        self.slot.read().await.last_activity.elapsed()
    }

    /// Wait until the latest enhancement task has finished
    pub async fn wait_for_enhancement(&self) {
        let handle = self.slot.write().await.enhancement.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Enhancement task failed: {}", e);
            }
        }
    }

    /// Wait until the latest facility search has finished
    pub async fn wait_for_facilities(&self) {
        let handle = self.slot.write().await.lookup.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Facility task failed: {}", e);
            }
        }
    }

    fn begin_lookup(&self, state: &mut SessionSlot) {
        state.lookup_seq += 1;

        let Some(location) = state.location else {
            state.facilities = FacilityStatus::NoLocation;
            return;
        };
        let Some(lookup) = &self.facilities else {
            state.facilities = FacilityStatus::Disabled;
            return;
        };

        state.facilities = FacilityStatus::Searching;
        let seq = state.lookup_seq;
        let lookup = Arc::clone(lookup);
        let slot = Arc::clone(&self.slot);

        state.lookup = Some(tokio::spawn(async move {
            let result = lookup.find_nearby(&location).await;

            let mut state = slot.write().await;
            if state.lookup_seq != seq {
                debug!("Discarding facility search for an old location");
                return;
            }
            state.facilities = match result {
                Ok(places) => {
                    info!("Facility search found {} places", places.total());
                    FacilityStatus::Found { places }
                }
                Err(e) => {
                    warn!("Facility search failed ({}): {}", e.code(), e);
                    FacilityStatus::Failed {
                        message: e.to_string(),
                    }
                }
            };
        }));
    }
}
