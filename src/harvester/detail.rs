//! Read one discussion page: main post, replies and counters.

use scraper::{ElementRef, Html};
use tracing::{debug, info};

use super::dom::{parse_count, rendered_text};
use super::layout::{ForumLayout, QueryChain};
use super::reveal::expand_fully;
use super::{HarvestError, Limits, Pacing};
use crate::models::{DiscussionDetail, Reply};
use crate::normalize::{normalize_post, Heuristics, KnownFields};
use crate::reconcile::{declared_reply_count, reconcile_replies};
use crate::session::PageSession;

/// Fields as they appear on the page, before cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDiscussion {
    pub title: String,
    pub author: String,
    pub role: String,
    pub time: String,
    pub body: String,
    pub views: u64,
    pub declared_replies: Option<u64>,
    pub replies: Vec<RawReply>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawReply {
    pub author: String,
    pub role: String,
    pub time: String,
    pub body: String,
    pub likes: u64,
}

/// Extract the raw fields of a fully expanded discussion page.
#[must_use]
pub fn parse_detail(html: &str, layout: &ForumLayout) -> RawDiscussion {
    let document = Html::parse_document(html);
    let root = document.root_element();

    // The first message container is the main post; without one, read the page
    let main_message = layout.message.first_element(root);
    let main = main_message.unwrap_or(root);

    let body = layout
        .post_body
        .first_text(main)
        .or_else(|| main_message.map(rendered_text))
        .unwrap_or_default();

    let replies = layout
        .message
        .first_with_at_least(root, 2)
        .into_iter()
        .skip(1)
        .map(|message| parse_reply(message, layout))
        .collect();

    RawDiscussion {
        title: layout.post_title.first_text(root).unwrap_or_default(),
        author: layout.post_author.first_text(main).unwrap_or_default(),
        role: layout.post_role.first_text(main).unwrap_or_default(),
        time: read_time(main, &layout.post_time),
        body,
        views: layout.views_icon.count(root) as u64,
        declared_replies: declared_reply_count(&rendered_text(root)),
        replies,
    }
}

fn parse_reply(message: ElementRef<'_>, layout: &ForumLayout) -> RawReply {
    RawReply {
        author: layout.message_author.first_text(message).unwrap_or_default(),
        role: layout.message_role.first_text(message).unwrap_or_default(),
        time: read_time(message, &layout.message_time),
        body: layout
            .message_body
            .first_text(message)
            .unwrap_or_else(|| rendered_text(message)),
        likes: layout
            .message_likes
            .first_text(message)
            .map_or(0, |label| parse_count(&label)),
    }
}

/// Displayed time, or the machine-readable `datetime` when the label is empty.
fn read_time(scope: ElementRef<'_>, chain: &QueryChain) -> String {
    chain
        .first_text(scope)
        .or_else(|| chain.first_attr(scope, "datetime"))
        .unwrap_or_default()
}

/// Clean the raw fields into a discussion record and bound its replies.
#[must_use]
pub fn build_detail(raw: RawDiscussion, url: &str, heuristics: &Heuristics) -> DiscussionDetail {
    let known = KnownFields {
        title: &raw.title,
        author: &raw.author,
        time: &raw.time,
        role: &raw.role,
    };
    let main = normalize_post(&raw.body, &raw.author, &known, heuristics);

    let replies: Vec<Reply> = raw
        .replies
        .iter()
        .filter_map(|reply| {
            let known = KnownFields {
                title: &raw.title,
                author: &reply.author,
                time: &reply.time,
                role: &reply.role,
            };
            normalize_post(&reply.body, &reply.author, &known, heuristics).map(|post| Reply {
                author: post.author,
                time: reply.time.clone(),
                content: post.content,
                likes: reply.likes,
            })
        })
        .collect();

    let dropped = raw.replies.len() - replies.len();
    if dropped > 0 {
        debug!(url, dropped, "Dropped empty replies");
    }

    let (author, content) = main.map_or_else(
        || (String::new(), String::new()),
        |post| (post.author, post.content),
    );

    let mut detail = DiscussionDetail {
        title: raw.title.clone(),
        url: url.to_string(),
        author,
        author_role: Some(raw.role.clone()).filter(|role| !role.is_empty()),
        time: raw.time.clone(),
        content,
        views: raw.views,
        likes: 0,
        comments: 0,
        replies,
    };
    reconcile_replies(&mut detail, raw.declared_replies);
    detail
}

/// Load a discussion, expand everything collapsed, and extract it.
///
/// # Errors
///
/// Returns an error if the page cannot be loaded, never renders a discussion,
/// or the session fails while reading it.
pub async fn extract_detail<S: PageSession + ?Sized>(
    session: &S,
    url: &str,
    layout: &ForumLayout,
    heuristics: &Heuristics,
    limits: &Limits,
    pacing: &Pacing,
) -> Result<DiscussionDetail, HarvestError> {
    session
        .navigate(url)
        .await
        .map_err(|source| HarvestError::Navigation {
            url: url.to_string(),
            source,
        })?;

    let markers = format!(
        "{}, {}",
        layout.article_marker.as_css_union(),
        layout.title_marker.as_css_union()
    );
    if !session.wait_for(&markers, limits.selector_timeout).await? {
        return Err(HarvestError::MissingContent {
            url: url.to_string(),
        });
    }

    let report = expand_fully(session, &layout.reveal_controls, limits, pacing).await;
    let html = session.snapshot().await?;
    let detail = build_detail(parse_detail(&html, layout), url, heuristics);

    info!(
        url,
        replies = detail.replies.len(),
        revealed = report.activations,
        "Extracted discussion"
    );
    Ok(detail)
}
