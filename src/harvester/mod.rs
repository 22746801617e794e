//! The crawl-and-extract pipeline.
//!
//! [`listing`] walks the category and collects discussion summaries,
//! [`detail`] expands and reads one discussion, and [`pipeline`] drives the
//! two sequentially with pacing between requests.

pub mod detail;
pub mod dom;
pub mod layout;
pub mod listing;
pub mod pipeline;
pub mod reveal;

use std::time::Duration;

use rand::Rng;
use thiserror::Error;

use crate::constants::{
    AUTO_SCROLL_JUMPS, MAX_LOAD_MORE_ATTEMPTS, MAX_REVEAL_ROUNDS, MAX_SCROLL_ATTEMPTS,
};
use crate::session::SessionError;

pub use detail::{extract_detail, parse_detail, RawDiscussion, RawReply};
pub use layout::{ForumLayout, LayoutError, QueryChain};
pub use listing::{crawl_listing, extract_summaries, CrawlState};
pub use pipeline::{HarvestStats, Harvester};
pub use reveal::{expand_fully, reveal_all, RevealReport};

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("failed to load listing start page {url}: {source}")]
    StartPage {
        url: String,
        #[source]
        source: SessionError,
    },
    #[error("failed to load discussion {url}: {source}")]
    Navigation {
        url: String,
        #[source]
        source: SessionError,
    },
    #[error("discussion {url} never rendered an article or title marker")]
    MissingContent { url: String },
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Bounds on waiting, retry loops and crawl reach.
#[derive(Debug, Clone)]
pub struct Limits {
    pub selector_timeout: Duration,
    pub max_reveal_rounds: usize,
    pub auto_scroll_jumps: usize,
    pub max_load_more: usize,
    pub max_scroll: usize,
    pub max_pages: Option<usize>,
    pub max_discussions: Option<usize>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            selector_timeout: Duration::from_secs(10),
            max_reveal_rounds: MAX_REVEAL_ROUNDS,
            auto_scroll_jumps: AUTO_SCROLL_JUMPS,
            max_load_more: MAX_LOAD_MORE_ATTEMPTS,
            max_scroll: MAX_SCROLL_ATTEMPTS,
            max_pages: None,
            max_discussions: None,
        }
    }
}

/// Delays between steps. All zero in tests.
#[derive(Debug, Clone, Default)]
pub struct Pacing {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub failure_delay: Duration,
    pub scroll_settle: Duration,
    pub reveal_settle: Duration,
}

impl Pacing {
    /// A delay drawn uniformly from `[min_delay, max_delay]`.
    #[must_use]
    pub fn jitter(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

/// Sleep unless the duration is zero.
pub(crate) async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
