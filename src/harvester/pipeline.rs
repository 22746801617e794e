//! Drive the listing crawl and then each discussion, one at a time.

use tracing::{info, warn};

use super::detail::extract_detail;
use super::layout::ForumLayout;
use super::listing::{crawl_listing, CrawlState};
use super::{pause, HarvestError, Limits, Pacing};
use crate::models::{DiscussionDetail, DiscussionSummary};
use crate::normalize::Heuristics;
use crate::session::PageSession;

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestStats {
    pub discovered: usize,
    pub harvested: usize,
    pub failed: usize,
    pub replies: usize,
}

/// Sequential crawl-and-extract driver over one page session.
pub struct Harvester<'a, S: PageSession + ?Sized> {
    session: &'a S,
    layout: ForumLayout,
    heuristics: Heuristics,
    limits: Limits,
    pacing: Pacing,
}

impl<'a, S: PageSession + ?Sized> Harvester<'a, S> {
    pub fn new(
        session: &'a S,
        layout: ForumLayout,
        heuristics: Heuristics,
        limits: Limits,
        pacing: Pacing,
    ) -> Self {
        Self {
            session,
            layout,
            heuristics,
            limits,
            pacing,
        }
    }

    /// Crawl the listing from `start_url`, then extract every discussion found,
    /// pushing each into `sink` as soon as it is ready.
    ///
    /// Records already in `sink` stay there if the run is cut short.
    ///
    /// # Errors
    ///
    /// Returns an error only if the listing start page cannot be loaded. A
    /// discussion that fails is logged and skipped.
    pub async fn run(
        &self,
        start_url: &str,
        sink: &mut Vec<DiscussionDetail>,
    ) -> Result<HarvestStats, HarvestError> {
        let state = crawl_listing(
            self.session,
            start_url,
            CrawlState::new(),
            &self.layout,
            &self.limits,
            &self.pacing,
        )
        .await?;

        let mut stats = HarvestStats {
            discovered: state.len(),
            ..HarvestStats::default()
        };
        let cap = self.limits.max_discussions.unwrap_or(usize::MAX);
        if state.len() > cap {
            info!(discovered = state.len(), cap, "Discussion limit applies");
        }

        let mut previous_failed = None;
        for (index, summary) in state.summaries().take(cap).enumerate() {
            match previous_failed {
                Some(true) => pause(self.pacing.failure_delay).await,
                Some(false) => pause(self.pacing.jitter()).await,
                None => {}
            }

            info!(
                index = index + 1,
                total = stats.discovered.min(cap),
                url = %summary.url,
                "Harvesting discussion"
            );

            match self.harvest_one(summary).await {
                Ok(detail) => {
                    stats.harvested += 1;
                    stats.replies += detail.replies.len();
                    sink.push(detail);
                    previous_failed = Some(false);
                }
                Err(e) => {
                    warn!(url = %summary.url, "Skipping discussion: {e}");
                    stats.failed += 1;
                    previous_failed = Some(true);
                }
            }
        }

        info!(
            discovered = stats.discovered,
            harvested = stats.harvested,
            failed = stats.failed,
            replies = stats.replies,
            "Harvest finished"
        );
        Ok(stats)
    }

    async fn harvest_one(&self, summary: &DiscussionSummary) -> Result<DiscussionDetail, HarvestError> {
        let mut detail = extract_detail(
            self.session,
            &summary.url,
            &self.layout,
            &self.heuristics,
            &self.limits,
            &self.pacing,
        )
        .await?;

        detail.apply_summary_counters(summary);
        fill_from_summary(&mut detail, summary);
        Ok(detail)
    }
}

/// Fall back to listing values for header fields the page did not yield.
fn fill_from_summary(detail: &mut DiscussionDetail, summary: &DiscussionSummary) {
    for (field, fallback) in [
        (&mut detail.title, &summary.title),
        (&mut detail.author, &summary.author),
        (&mut detail.time, &summary.time),
    ] {
        if field.is_empty() {
            field.clone_from(fallback);
        }
    }
}
