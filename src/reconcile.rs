//! Bound extracted replies by the count the page itself declares.
//!
//! Message conventions occasionally match quoted or embedded posts too, so
//! the reply list can come out longer than the page's own "N Replies" label.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::DiscussionDetail;

static DECLARED_COUNT: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(\d[\d,]*)\s+repl(?:y|ies)\b",
        r"(?i)\breplies\s*\(\s*(\d[\d,]*)\s*\)",
        r"(?i)\b(\d[\d,]*)\s+comments?\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// The reply count stated in the page text, trying each label form in order.
#[must_use]
pub fn declared_reply_count(page_text: &str) -> Option<u64> {
    DECLARED_COUNT.iter().find_map(|pattern| {
        pattern
            .captures(page_text)
            .and_then(|caps| caps[1].replace(',', "").parse().ok())
    })
}

/// Drop replies beyond the declared count and set `comments` to the result.
pub fn reconcile_replies(detail: &mut DiscussionDetail, declared: Option<u64>) {
    if let Some(declared) = declared {
        let bound = usize::try_from(declared).unwrap_or(usize::MAX);
        if detail.replies.len() > bound {
            debug!(
                url = %detail.url,
                extracted = detail.replies.len(),
                declared,
                "Truncating replies to declared count"
            );
            detail.replies.truncate(bound);
        }
    }
    detail.comments = detail.replies.len() as u64;
}
