//! Disclose collapsed content before a page is read.
//!
//! Activating a "show more" control can render further controls, so clicking
//! runs in rounds until a round activates nothing or the round cap is hit.

use std::ops::AddAssign;

use tracing::{debug, warn};

use super::{pause, Limits, Pacing};
use crate::constants::REVEAL_SCROLL_STEP;
use crate::session::{PageSession, RevealQuery};

/// What a reveal pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevealReport {
    pub rounds: usize,
    pub activations: usize,
    /// A round found nothing left to activate.
    pub converged: bool,
}

impl AddAssign for RevealReport {
    fn add_assign(&mut self, other: Self) {
        self.rounds += other.rounds;
        self.activations += other.activations;
        self.converged = other.converged;
    }
}

/// Click every visible disclosure control, round after round, until none remain.
///
/// A control that cannot be activated is skipped; this never fails.
pub async fn reveal_all<S: PageSession + ?Sized>(
    session: &S,
    queries: &[RevealQuery],
    limits: &Limits,
    pacing: &Pacing,
) -> RevealReport {
    let mut report = RevealReport::default();

    while report.rounds < limits.max_reveal_rounds {
        report.rounds += 1;
        if let Err(e) = session.reset_activations().await {
            debug!("Could not reset activation marks: {e}");
        }

        // Overlapping queries count a shared control once per round
        let mut activated = 0;
        for query in queries {
            match session.click_visible(query).await {
                Ok(n) => activated += n,
                Err(e) => debug!(selector = %query.selector, "Reveal control skipped: {e}"),
            }
        }

        if activated == 0 {
            report.converged = true;
            break;
        }
        report.activations += activated;

        // Bring controls below the fold into view for the next round
        if let Err(e) = session.scroll_by(REVEAL_SCROLL_STEP).await {
            debug!("Reveal scroll failed: {e}");
        }
        pause(pacing.reveal_settle).await;
    }

    if report.converged {
        debug!(
            rounds = report.rounds,
            activations = report.activations,
            "Reveal pass converged"
        );
    } else {
        warn!(
            rounds = report.rounds,
            activations = report.activations,
            "Reveal round budget exhausted with controls still appearing"
        );
    }
    report
}

/// Reveal, scroll to the bottom a few times to trigger lazy loading, then
/// reveal again to catch controls that loading brought in.
pub async fn expand_fully<S: PageSession + ?Sized>(
    session: &S,
    queries: &[RevealQuery],
    limits: &Limits,
    pacing: &Pacing,
) -> RevealReport {
    let mut report = reveal_all(session, queries, limits, pacing).await;

    for _ in 0..limits.auto_scroll_jumps {
        let height = match session.scroll_height().await {
            Ok(h) => h,
            Err(e) => {
                debug!("Could not read page height: {e}");
                break;
            }
        };
        if let Err(e) = session.scroll_by(height as i64).await {
            debug!("Auto-scroll failed: {e}");
            break;
        }
        pause(pacing.scroll_settle).await;
    }

    report += reveal_all(session, queries, limits, pacing).await;
    report
}
