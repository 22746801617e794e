//! Records produced by the crawl and written to the export.

use serde::{Deserialize, Serialize};

/// One row of a listing page.
///
/// `url` is the canonical identity of a discussion: absolute, without fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionSummary {
    pub url: String,
    pub title: String,
    pub author: String,
    pub time: String,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
}

/// A fully resolved discussion: main post plus replies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionDetail {
    pub title: String,
    pub url: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_role: Option<String>,
    pub time: String,
    pub content: String,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub replies: Vec<Reply>,
}

impl DiscussionDetail {
    /// Take the listing page's counters, which are authoritative for views and likes.
    pub fn apply_summary_counters(&mut self, summary: &DiscussionSummary) {
        self.views = summary.views;
        self.likes = summary.likes;
    }
}

/// A responding post within a discussion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub author: String,
    pub time: String,
    pub content: String,
    pub likes: u64,
}
