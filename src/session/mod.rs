//! Access to a rendered page.
//!
//! The crawl logic only talks to a [`PageSession`]; launching and configuring
//! the browser behind it lives in [`chromium`].

pub mod auth;
pub mod chromium;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use chromium::{ChromiumSession, SessionOptions};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("navigation to {url} timed out")]
    NavigationTimeout { url: String },
    #[error("script evaluation failed: {0}")]
    Script(String),
    #[error("unexpected script result: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A query for controls that disclose more content when activated.
///
/// `text`, when set, narrows the CSS matches to elements whose trimmed
/// visible text starts with it (case-insensitive), e.g. buttons labelled
/// "Show more" or "Show more (3)".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealQuery {
    pub selector: String,
    pub text: Option<String>,
}

impl RevealQuery {
    #[must_use]
    pub fn css(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            text: None,
        }
    }

    #[must_use]
    pub fn with_text(selector: &str, text: &str) -> Self {
        Self {
            selector: selector.to_string(),
            text: Some(text.to_lowercase()),
        }
    }

    /// Whether an element's visible text satisfies the text filter.
    #[must_use]
    pub fn matches_text(&self, element_text: &str) -> bool {
        self.text
            .as_ref()
            .is_none_or(|needle| {
                element_text
                    .trim()
                    .to_lowercase()
                    .starts_with(needle.as_str())
            })
    }
}

/// The primitives the crawler needs from a rendering session.
///
/// Every call is a suspension point; implementations are driven strictly
/// one call at a time.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Load `url` and wait for the navigation to settle.
    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    /// The page URL after any redirects.
    async fn current_url(&self) -> Result<String, SessionError>;

    /// Wait until `selector` matches something. `Ok(false)` on timeout.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool, SessionError>;

    /// Number of elements matching `selector`.
    async fn count(&self, selector: &str) -> Result<usize, SessionError>;

    /// Visible text of each element matching `selector`.
    async fn visible_texts(&self, selector: &str) -> Result<Vec<String>, SessionError>;

    /// Click every currently visible match of `query`, returning how many were
    /// activated. A control that vanishes mid-click is skipped, not an error.
    /// An element already activated since the last [`reset_activations`]
    /// is not clicked again, so overlapping queries count it once.
    ///
    /// [`reset_activations`]: PageSession::reset_activations
    async fn click_visible(&self, query: &RevealQuery) -> Result<usize, SessionError>;

    /// Forget which elements `click_visible` has activated.
    async fn reset_activations(&self) -> Result<(), SessionError>;

    async fn scroll_by(&self, dy: i64) -> Result<(), SessionError>;

    /// Current rendered document height in pixels.
    async fn scroll_height(&self) -> Result<u64, SessionError>;

    /// Evaluate a read-only script in the page and return its JSON result.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, SessionError>;

    /// Serialized snapshot of the rendered DOM.
    async fn snapshot(&self) -> Result<String, SessionError>;
}
