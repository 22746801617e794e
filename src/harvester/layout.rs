//! Declarative description of where fields live on the forum's pages.
//!
//! Each field is a ranked [`QueryChain`]: selectors are tried in order and the
//! first one producing a non-empty value wins. Supporting a new layout variant
//! means adding a selector here, not touching the crawl logic.

use scraper::{ElementRef, Selector};
use thiserror::Error;

use super::dom::rendered_text;
use crate::session::RevealQuery;

#[derive(Debug, Error)]
#[error("invalid selector '{selector}': {message}")]
pub struct LayoutError {
    pub selector: String,
    pub message: String,
}

/// Ranked CSS selectors for one field.
#[derive(Debug, Clone)]
pub struct QueryChain {
    queries: Vec<(String, Selector)>,
}

impl QueryChain {
    /// Compile a chain, most specific selector first.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first selector that fails to parse.
    pub fn new<S: AsRef<str>>(queries: &[S]) -> Result<Self, LayoutError> {
        let queries = queries
            .iter()
            .map(|q| {
                let raw = q.as_ref();
                Selector::parse(raw)
                    .map(|selector| (raw.to_string(), selector))
                    .map_err(|e| LayoutError {
                        selector: raw.to_string(),
                        message: format!("{e:?}"),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { queries })
    }

    fn builtin(queries: &[&str]) -> Self {
        Self::new(queries).expect("built-in selectors are valid")
    }

    /// All selectors joined into one CSS selector list, for in-page waits.
    #[must_use]
    pub fn as_css_union(&self) -> String {
        self.queries
            .iter()
            .map(|(raw, _)| raw.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// First element matched by the highest-ranked selector that matches at all.
    #[must_use]
    pub fn first_element<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.queries
            .iter()
            .find_map(|(_, selector)| scope.select(selector).next())
    }

    /// First non-empty rendered text, in rank order.
    #[must_use]
    pub fn first_text(&self, scope: ElementRef<'_>) -> Option<String> {
        self.queries.iter().find_map(|(_, selector)| {
            scope
                .select(selector)
                .map(rendered_text)
                .find(|text| !text.is_empty())
        })
    }

    /// First non-empty value of `attr`, in rank order.
    #[must_use]
    pub fn first_attr(&self, scope: ElementRef<'_>, attr: &str) -> Option<String> {
        self.queries.iter().find_map(|(_, selector)| {
            scope
                .select(selector)
                .filter_map(|el| el.value().attr(attr))
                .map(str::trim)
                .find(|value| !value.is_empty())
                .map(ToString::to_string)
        })
    }

    /// All matches of the first selector yielding at least `min` elements.
    #[must_use]
    pub fn first_with_at_least<'a>(&self, scope: ElementRef<'a>, min: usize) -> Vec<ElementRef<'a>> {
        self.queries
            .iter()
            .map(|(_, selector)| scope.select(selector).collect::<Vec<_>>())
            .find(|matches| !matches.is_empty() && matches.len() >= min)
            .unwrap_or_default()
    }

    /// Number of matches of the first selector that matches anything.
    #[must_use]
    pub fn count(&self, scope: ElementRef<'_>) -> usize {
        self.queries
            .iter()
            .map(|(_, selector)| scope.select(selector).count())
            .find(|&n| n > 0)
            .unwrap_or(0)
    }
}

/// Where every field lives on listing and discussion pages.
#[derive(Debug, Clone)]
pub struct ForumLayout {
    // Listing pages
    pub list_container: QueryChain,
    pub summary_row: QueryChain,
    pub row_link: QueryChain,
    pub row_title: QueryChain,
    pub row_author: QueryChain,
    pub row_time: QueryChain,
    pub row_views: QueryChain,
    pub row_likes: QueryChain,
    pub row_replies: QueryChain,
    pub load_more: Vec<RevealQuery>,
    pub next_page: QueryChain,

    // Discussion pages
    pub article_marker: QueryChain,
    pub title_marker: QueryChain,
    pub post_title: QueryChain,
    pub post_author: QueryChain,
    pub post_role: QueryChain,
    pub post_time: QueryChain,
    pub post_body: QueryChain,
    pub message: QueryChain,
    pub message_author: QueryChain,
    pub message_role: QueryChain,
    pub message_time: QueryChain,
    pub message_body: QueryChain,
    pub message_likes: QueryChain,
    pub views_icon: QueryChain,
    pub reveal_controls: Vec<RevealQuery>,
}

/// Anchors that act as buttons rather than links away from the page.
const INERT_ANCHOR: &str = "a[role='button'], a:not([href]), a[href='#']";

impl Default for ForumLayout {
    fn default() -> Self {
        let author = [
            "[data-testid='author-name']",
            ".topic-author .username",
            ".author .username",
            ".author-name",
            ".username",
            ".author",
        ];
        let role = [
            "[data-testid='author-role']",
            ".author-role",
            ".user-role",
            ".user-title",
        ];
        let time = [
            "[data-testid='post-time']",
            "time",
            ".post-date",
            ".relative-date",
            ".timestamp",
        ];
        let body = [
            "[data-testid='post-body']",
            ".topic-body .cooked",
            ".post-body",
            ".message-body",
            ".cooked",
        ];

        Self {
            list_container: QueryChain::builtin(&[
                "[data-testid='discussion-list']",
                ".topic-list",
                ".discussion-list",
                "ul.discussions",
            ]),
            summary_row: QueryChain::builtin(&[
                "[data-testid='discussion-item']",
                ".topic-list-item",
                ".discussion-list-item",
                "li.discussion",
            ]),
            row_link: QueryChain::builtin(&[
                "a[data-testid='discussion-link']",
                "a.title",
                "a.topic-title",
                "h3 a[href]",
                "a[href]",
            ]),
            row_title: QueryChain::builtin(&[
                "[data-testid='discussion-title']",
                "a.title",
                ".topic-title",
                "h3",
            ]),
            row_author: QueryChain::builtin(&author),
            row_time: QueryChain::builtin(&time),
            row_views: QueryChain::builtin(&["[data-testid='views']", ".views .number", ".views"]),
            row_likes: QueryChain::builtin(&["[data-testid='likes']", ".likes .number", ".likes"]),
            row_replies: QueryChain::builtin(&[
                "[data-testid='replies']",
                ".replies .number",
                ".posts .number",
                ".replies",
            ]),
            load_more: vec![
                RevealQuery::css("[data-testid='load-more']"),
                RevealQuery::css("button.load-more"),
                RevealQuery::with_text("button", "load more"),
                RevealQuery::with_text("button", "show more discussions"),
            ],
            next_page: QueryChain::builtin(&[
                "a[rel='next']",
                ".pagination a.next",
                "li.next a",
                "a[aria-label='Next']",
                "a[aria-label='Next page']",
            ]),

            article_marker: QueryChain::builtin(&["article", "[role='article']", ".topic-post"]),
            title_marker: QueryChain::builtin(&["[data-testid='discussion-title']", "h1"]),
            post_title: QueryChain::builtin(&[
                "[data-testid='discussion-title']",
                "h1.topic-title",
                ".topic-title",
                "h1",
            ]),
            post_author: QueryChain::builtin(&author),
            post_role: QueryChain::builtin(&role),
            post_time: QueryChain::builtin(&time),
            post_body: QueryChain::builtin(&body),
            message: QueryChain::builtin(&[
                "[data-testid='message']",
                ".topic-post",
                "article.post",
                ".message",
                "article",
            ]),
            message_author: QueryChain::builtin(&author),
            message_role: QueryChain::builtin(&role),
            message_time: QueryChain::builtin(&time),
            message_body: QueryChain::builtin(&body),
            message_likes: QueryChain::builtin(&[
                "[data-testid='like-count']",
                ".like-count",
                ".likes .number",
                ".likes",
            ]),
            views_icon: QueryChain::builtin(&[
                "[data-testid='views'] svg",
                ".views svg",
                ".views i",
            ]),
            reveal_controls: vec![
                RevealQuery::css("[data-testid='show-more']"),
                RevealQuery::css("button.show-more"),
                RevealQuery::css(".read-more"),
                RevealQuery::with_text("button", "show more"),
                RevealQuery::with_text("button", "read more"),
                RevealQuery::with_text("button", "load more replies"),
                RevealQuery::with_text(INERT_ANCHOR, "show more"),
                RevealQuery::with_text(INERT_ANCHOR, "read more"),
            ],
        }
    }
}
