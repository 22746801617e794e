//! Listing crawl: walk a category's pages and collect discussion summaries.
//!
//! A listing page may grow in place (a "load more" button, infinite scroll)
//! and may link to a next page. Rows are re-collected after every growth step
//! so nothing rendered transiently is missed; the dedup store keeps the first
//! sighting of each URL.

use std::collections::HashSet;

use indexmap::IndexMap;
use scraper::Html;
use tracing::{debug, info, warn};

use super::dom::{parse_count, resolve_url};
use super::layout::{ForumLayout, QueryChain};
use super::{pause, HarvestError, Limits, Pacing};
use crate::models::DiscussionSummary;
use crate::session::PageSession;

/// Run-scoped crawl state: the dedup store and the visited-page guard.
///
/// Passed into [`crawl_listing`] and handed back when the crawl ends.
#[derive(Debug, Clone, Default)]
pub struct CrawlState {
    summaries: IndexMap<String, DiscussionSummary>,
    visited: HashSet<String>,
}

impl CrawlState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a summary unless its URL was already seen. Returns whether it was new.
    pub fn insert(&mut self, summary: DiscussionSummary) -> bool {
        if self.summaries.contains_key(&summary.url) {
            return false;
        }
        self.summaries.insert(summary.url.clone(), summary);
        true
    }

    /// Record a listing page visit. Returns `false` if it was already visited.
    pub fn mark_visited(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    #[must_use]
    pub fn has_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    #[must_use]
    pub fn pages_visited(&self) -> usize {
        self.visited.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    #[must_use]
    pub fn get(&self, url: &str) -> Option<&DiscussionSummary> {
        self.summaries.get(url)
    }

    /// Summaries in discovery order.
    pub fn summaries(&self) -> impl Iterator<Item = &DiscussionSummary> {
        self.summaries.values()
    }
}

/// Read every summary row currently in `html`.
///
/// Rows without a link that resolves to an http(s) URL are skipped.
#[must_use]
pub fn extract_summaries(html: &str, base_url: &str, layout: &ForumLayout) -> Vec<DiscussionSummary> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    layout
        .summary_row
        .first_with_at_least(root, 1)
        .into_iter()
        .filter_map(|row| {
            let href = layout.row_link.first_attr(row, "href")?;
            let url = resolve_url(base_url, &href)?;
            let count = |chain: &QueryChain| chain.first_text(row).map_or(0, |t| parse_count(&t));

            Some(DiscussionSummary {
                url,
                title: layout.row_title.first_text(row).unwrap_or_default(),
                author: layout.row_author.first_text(row).unwrap_or_default(),
                time: layout.row_time.first_text(row).unwrap_or_default(),
                views: count(&layout.row_views),
                likes: count(&layout.row_likes),
                comments: count(&layout.row_replies),
            })
        })
        .collect()
}

/// Absolute URL of the "next page" link, if the page has one.
#[must_use]
pub fn find_next_page(html: &str, base_url: &str, layout: &ForumLayout) -> Option<String> {
    let document = Html::parse_document(html);
    let href = layout.next_page.first_attr(document.root_element(), "href")?;
    resolve_url(base_url, &href)
}

/// Crawl listing pages from `start_url`, following "next" links until none
/// remain, a page repeats, or `max_pages` is reached.
///
/// # Errors
///
/// Only a failure to load the start page is an error. Later pages that fail to
/// load, and session failures while growing a page, end pagination with what
/// was collected so far.
pub async fn crawl_listing<S: PageSession + ?Sized>(
    session: &S,
    start_url: &str,
    mut state: CrawlState,
    layout: &ForumLayout,
    limits: &Limits,
    pacing: &Pacing,
) -> Result<CrawlState, HarvestError> {
    let mut next = Some(start_url.to_string());
    let mut pages = 0usize;

    while let Some(url) = next.take() {
        if limits.max_pages.is_some_and(|max| pages >= max) {
            info!(pages, "Listing page limit reached");
            break;
        }
        if !state.mark_visited(&url) {
            info!(url = %url, "Listing page already visited, stopping pagination");
            break;
        }

        if let Err(e) = session.navigate(&url).await {
            if pages == 0 {
                return Err(HarvestError::StartPage { url, source: e });
            }
            warn!(url = %url, "Failed to load listing page, stopping pagination: {e}");
            break;
        }
        pages += 1;

        let page_url = session.current_url().await.unwrap_or_else(|_| url.clone());
        if page_url != url && !state.mark_visited(&page_url) {
            info!(
                url = %url,
                landed = %page_url,
                "Redirected to a visited listing page, stopping pagination"
            );
            break;
        }
        let before = state.len();
        match crawl_page(session, &page_url, &mut state, layout, limits, pacing).await {
            Ok(link) => next = link,
            Err(e) => warn!(url = %page_url, "Listing page interrupted, stopping pagination: {e}"),
        }

        info!(
            page = pages,
            url = %page_url,
            new = state.len() - before,
            total = state.len(),
            "Collected listing page"
        );
    }

    info!(
        pages,
        discussions = state.len(),
        "Listing crawl finished"
    );
    Ok(state)
}

/// Collect one listing page through all its growth steps and return the
/// next page link, if any.
async fn crawl_page<S: PageSession + ?Sized>(
    session: &S,
    page_url: &str,
    state: &mut CrawlState,
    layout: &ForumLayout,
    limits: &Limits,
    pacing: &Pacing,
) -> Result<Option<String>, HarvestError> {
    let container = layout.list_container.as_css_union();
    if !session.wait_for(&container, limits.selector_timeout).await? {
        warn!(url = %page_url, "List container did not appear; page may be empty");
    }

    let mut html = collect(session, page_url, state, layout).await?;

    for attempt in 1..=limits.max_load_more {
        if let Err(e) = session.reset_activations().await {
            debug!("Could not reset activation marks: {e}");
        }
        let mut clicked = 0;
        for query in &layout.load_more {
            match session.click_visible(query).await {
                Ok(n) => clicked += n,
                Err(e) => debug!(selector = %query.selector, "Load-more click skipped: {e}"),
            }
        }
        if clicked == 0 {
            break;
        }
        pause(pacing.scroll_settle).await;
        html = collect(session, page_url, state, layout).await?;
        debug!(attempt, total = state.len(), "Re-collected after load more");
    }

    let mut height = session.scroll_height().await?;
    for attempt in 1..=limits.max_scroll {
        session.scroll_by(height as i64).await?;
        pause(pacing.scroll_settle).await;
        html = collect(session, page_url, state, layout).await?;

        let grown = session.scroll_height().await?;
        debug!(attempt, height = grown, total = state.len(), "Re-collected after scroll");
        if grown <= height {
            break;
        }
        height = grown;
    }

    Ok(find_next_page(&html, page_url, layout))
}

/// Snapshot the page, store any unseen rows, and return the snapshot.
async fn collect<S: PageSession + ?Sized>(
    session: &S,
    page_url: &str,
    state: &mut CrawlState,
    layout: &ForumLayout,
) -> Result<String, HarvestError> {
    let html = session.snapshot().await?;
    for summary in extract_summaries(&html, page_url, layout) {
        state.insert(summary);
    }
    Ok(html)
}
