//! Guidance merger: instant local guidance, optional enhancement later.
//!
//! Phase 1 runs synchronously under the session lock and publishes the triage
//! result before anything asynchronous is spawned. Phase 2 runs detached and
//! writes back only if the session generation is still the one it started
//! under. Emergency logging runs alongside and never touches guidance.

use lifeline_shared::{
    CompleteAssessment, Generation, GuidanceResult, GuidanceState, MergeOutcome, TriageEngine,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::emergency_log::EmergencyLogger;
use crate::enhancer::{EnhanceError, GuidanceEnhancer};
use crate::service::{SessionSlot, SharedSlot};

pub struct GuidanceMerger {
    engine: TriageEngine,
    enhancer: Option<Arc<dyn GuidanceEnhancer>>,
    logger: Arc<dyn EmergencyLogger>,
    online: AtomicBool,
}

impl GuidanceMerger {
    pub fn new(
        engine: TriageEngine,
        enhancer: Option<Arc<dyn GuidanceEnhancer>>,
        logger: Arc<dyn EmergencyLogger>,
    ) -> Self {
        Self {
            engine,
            enhancer,
            logger,
            online: AtomicBool::new(true),
        }
    }

    pub fn engine(&self) -> &TriageEngine {
        &self.engine
    }

    pub fn logger(&self) -> &Arc<dyn EmergencyLogger> {
        &self.logger
    }

    pub fn set_online(&self, online: bool) {
        let was = self.online.swap(online, Ordering::Relaxed);
        if was != online {
            info!("Connectivity changed: online={}", online);
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    /// Phase 2 is attempted only with an enhancer and connectivity
    pub fn will_enhance(&self) -> bool {
        self.enhancer.is_some() && self.is_online()
    }

    /// Phase 1: local guidance, marked enhancing when Phase 2 will run
    pub fn phase_one(&self, assessment: &CompleteAssessment) -> GuidanceState {
        GuidanceState::local(self.engine.compute(assessment), self.will_enhance())
    }

    /// Publish Phase 1 into `state`, then start Phase 2 and logging.
    ///
    /// `state` must be the locked contents of `slot`; spawned tasks take the
    /// lock again only after the caller releases it.
    pub fn on_complete(&self, slot: &SharedSlot, state: &mut SessionSlot, assessment: CompleteAssessment) {
        let guidance = self.phase_one(&assessment);
        let generation = state.session.generation();
        info!(
            "Guidance {}: {} ({} steps, cpr={}, enhancing={})",
            generation,
            guidance.result.priority,
            guidance.result.instructions.len(),
            guidance.result.show_cpr,
            guidance.is_enhancing
        );
        let enhancing = guidance.is_enhancing;
        state.guidance = Some(guidance);

        self.spawn_log(assessment, state);

        if enhancing {
            if let Some(enhancer) = &self.enhancer {
                state.enhancement = Some(tokio::spawn(run_phase_two(
                    Arc::clone(enhancer),
                    Arc::clone(slot),
                    generation,
                    assessment,
                )));
            }
        }
    }

    fn spawn_log(&self, assessment: CompleteAssessment, state: &SessionSlot) {
        let logger = Arc::clone(&self.logger);
        let location = state.location;
        tokio::spawn(async move {
            if let Err(e) = logger.log_assessment(&assessment, location.as_ref()).await {
                warn!("Emergency log failed ({}): {}", e.code(), e);
            }
        });
    }

    /// Both phases in one call, for callers without a session
    pub async fn guidance_once(&self, assessment: &CompleteAssessment) -> GuidanceState {
        let mut guidance = self.phase_one(assessment);
        if !guidance.is_enhancing {
            return guidance;
        }
        let Some(enhancer) = &self.enhancer else {
            guidance.settle();
            return guidance;
        };

        match call_enhancer(Arc::clone(enhancer), *assessment).await {
            Ok(enhanced) => {
                let outcome = guidance.apply_enhancement(enhanced);
                if outcome != MergeOutcome::Applied {
                    warn!("Enhancement not applied: {:?}", outcome);
                }
            }
            Err(e) => {
                warn!("Enhancement failed, using local guidance ({}): {}", e.code(), e);
                guidance.settle();
            }
        }
        guidance
    }
}

/// Run the enhancer in its own task so a panic settles like any other failure
async fn call_enhancer(
    enhancer: Arc<dyn GuidanceEnhancer>,
    assessment: CompleteAssessment,
) -> Result<GuidanceResult, EnhanceError> {
    match tokio::spawn(async move { enhancer.enhance(&assessment).await }).await {
        Ok(outcome) => outcome,
        Err(e) => Err(EnhanceError::Aborted(e.to_string())),
    }
}

async fn run_phase_two(
    enhancer: Arc<dyn GuidanceEnhancer>,
    slot: SharedSlot,
    generation: Generation,
    assessment: CompleteAssessment,
) {
    let outcome = call_enhancer(enhancer, assessment).await;

    let mut state = slot.write().await;
    let current = state.session.generation();
    if current != generation {
        debug!("Discarding enhancement for {} (session at {})", generation, current);
        return;
    }
    let Some(guidance) = state.guidance.as_mut() else {
        return;
    };

    match outcome {
        Ok(enhanced) => match guidance.apply_enhancement(enhanced) {
            MergeOutcome::Applied => info!(
                "Enhanced guidance {}: {} ({} steps, cpr={})",
                generation,
                guidance.result.priority,
                guidance.result.instructions.len(),
                guidance.result.show_cpr
            ),
            other => warn!("Enhancement not applied: {:?}", other),
        },
        Err(e) => {
            warn!("Enhancement failed, keeping local guidance ({}): {}", e.code(), e);
            guidance.settle();
        }
    }
}
