//! Shutdown coordination
//!
//! The pipeline stops in two phases: first the page stage (the only producer
//! of review identifiers), then the review stage. This module owns the phase
//! machine, the two stage cancellation tokens, and the instants of each step.

use crate::output::ShutdownTimeline;
use crate::state::PipelinePhase;
use crate::PitchforkError;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Drives `Running -> DrainingPages -> DrainingReviews -> Stopped`
#[derive(Debug)]
pub struct ShutdownCoordinator {
    phase: watch::Sender<PipelinePhase>,
    pages: CancellationToken,
    reviews: CancellationToken,
    interrupted: bool,
    timeline: ShutdownTimeline,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(PipelinePhase::Running);

        Self {
            phase,
            pages: CancellationToken::new(),
            reviews: CancellationToken::new(),
            interrupted: false,
            timeline: ShutdownTimeline::default(),
        }
    }

    pub fn phase(&self) -> PipelinePhase {
        *self.phase.borrow()
    }

    /// Receiver that observes every phase change
    pub fn subscribe(&self) -> watch::Receiver<PipelinePhase> {
        self.phase.subscribe()
    }

    /// Token shared by every page worker and the page source
    pub fn pages_token(&self) -> CancellationToken {
        self.pages.clone()
    }

    /// Token shared by every review worker
    pub fn reviews_token(&self) -> CancellationToken {
        self.reviews.clone()
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn timeline(&self) -> ShutdownTimeline {
        self.timeline
    }

    /// Moves to the next phase
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The phase was published
    /// * `Err(PitchforkError::InvalidTransition)` - `to` is not the next phase
    pub fn transition(&mut self, to: PipelinePhase) -> Result<(), PitchforkError> {
        let from = self.phase();
        if !from.can_transition_to(to) {
            return Err(PitchforkError::InvalidTransition { from, to });
        }

        self.phase.send_replace(to);
        tracing::info!("Pipeline phase: {} -> {}", from, to);
        Ok(())
    }

    /// Records the external interrupt; later calls are ignored
    pub fn record_interrupt(&mut self) {
        if !self.interrupted {
            self.interrupted = true;
            self.timeline.interrupted_at = Some(Instant::now());
            tracing::info!("Interrupt received, draining the pipeline");
        }
    }

    pub fn cancel_pages(&mut self) {
        if !self.pages.is_cancelled() {
            self.pages.cancel();
            self.timeline.pages_cancelled_at = Some(Instant::now());
        }
    }

    /// Broadcasts cancellation to the review stage
    ///
    /// Review workers stop sleeping between retries but keep drawing until the
    /// closed queue is empty. Must only be called after every page worker has
    /// exited.
    pub fn cancel_reviews(&mut self) {
        if !self.reviews.is_cancelled() {
            self.reviews.cancel();
            self.timeline.reviews_cancelled_at = Some(Instant::now());
        }
    }

    pub fn pages_drained(&mut self) {
        self.timeline.pages_drained_at = Some(Instant::now());
    }

    pub fn reviews_drained(&mut self) {
        self.timeline.reviews_drained_at = Some(Instant::now());
    }
}

/// Completes on Ctrl-C (SIGINT) or, on Unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Unable to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Unable to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl-C received"),
        _ = terminate => tracing::info!("SIGTERM received"),
    }
}
