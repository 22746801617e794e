//! Integration tests for discussion expansion, extraction and the run driver.

mod common;

use common::{listing_page, listing_row, FakePage, FakeSession};
use discussion_harvester::harvester::{
    expand_fully, extract_detail, reveal_all, ForumLayout, HarvestError, Harvester, Limits,
    Pacing,
};
use discussion_harvester::normalize::Heuristics;
use discussion_harvester::session::PageSession;

const LISTING: &str = "https://forum.example.com/c/help";
const ROUTER: &str = "https://forum.example.com/t/router-drops/7";
const PRINTER: &str = "https://forum.example.com/t/printer-offline/9";

fn collapsed_discussion() -> FakePage {
    let head = r#"<html><body>
        <h1 data-testid="discussion-title">Router drops connection</h1>
        <article data-testid="message">
            <span data-testid="author-name">netguy</span>
            <span data-testid="author-role">Contributor</span>
            <time>Mar 1</time>
            <div data-testid="post-body"><p>netguy</p><p>It drops every hour.</p><p>Like</p><p>3</p></div>
        </article>
        <div>2 Replies</div>"#;
    let reply = |author: &str, body: &str| {
        format!(
            r#"<article data-testid="message">
                <span data-testid="author-name">{author}</span>
                <time>Mar 2</time>
                <div data-testid="post-body">{body}</div>
                <span data-testid="like-count">1</span>
            </article>"#
        )
    };

    let first = format!(
        r#"{head}{}<button data-testid="show-more">Show more</button></body></html>"#,
        reply("mod_anna", "<p>Please share your logs.</p>")
    );
    let second = format!(
        r#"{head}{}{}<a class="read-more">Read more</a></body></html>"#,
        reply("mod_anna", "<p>Please share your logs.</p>"),
        reply("", "<p>janedoe92, same issue since the update</p><p>Reply</p>"),
    );
    let expanded = format!(
        r#"{head}{}{}{}{}</body></html>"#,
        reply("mod_anna", "<p>Please share your logs.</p>"),
        reply("", "<p>janedoe92, same issue since the update</p><p>Reply</p>"),
        reply("", "<p>Like</p><p>Copy link</p>"),
        reply("latecomer", "<p>Quoted from another thread</p>"),
    );

    FakePage::new(first).on_click(second).on_click(expanded)
}

fn simple_discussion(title: &str) -> FakePage {
    FakePage::new(format!(
        r#"<html><body>
            <h1>{title}</h1>
            <article data-testid="message">
                <div data-testid="post-body"><p>Hi there, my printer shows offline</p></div>
            </article>
        </body></html>"#
    ))
}

#[tokio::test]
async fn test_reveal_converges_and_is_idempotent() {
    let session = FakeSession::new().page(ROUTER, collapsed_discussion());
    session.navigate(ROUTER).await.unwrap();
    let layout = ForumLayout::default();
    let limits = Limits::default();
    let pacing = Pacing::default();

    let first = reveal_all(&session, &layout.reveal_controls, &limits, &pacing).await;
    assert!(first.converged);
    assert_eq!(first.activations, 2);

    let second = reveal_all(&session, &layout.reveal_controls, &limits, &pacing).await;
    assert!(second.converged);
    assert_eq!(second.activations, 0);
    assert_eq!(second.rounds, 1);

    let again = expand_fully(&session, &layout.reveal_controls, &limits, &pacing).await;
    assert_eq!(again.activations, 0);
}

#[tokio::test]
async fn test_reveal_stops_at_round_budget() {
    // A control that never goes away
    let page = FakePage::new(
        r#"<html><body><h1>Loop</h1><button class="show-more">Show more</button></body></html>"#,
    );
    let session = FakeSession::new().page(ROUTER, page);
    session.navigate(ROUTER).await.unwrap();
    let limits = Limits {
        max_reveal_rounds: 3,
        ..Limits::default()
    };

    let report = reveal_all(
        &session,
        &ForumLayout::default().reveal_controls,
        &limits,
        &Pacing::default(),
    )
    .await;

    assert!(!report.converged);
    assert_eq!(report.rounds, 3);
}

#[tokio::test]
async fn test_control_shared_by_overlapping_queries_is_clicked_once_per_round() {
    // Matched by the test id, the class and the label queries alike
    let page = FakePage::new(
        r#"<html><body><h1>Loop</h1>
            <button data-testid="show-more" class="show-more">Show more</button>
        </body></html>"#,
    );
    let session = FakeSession::new().page(ROUTER, page);
    session.navigate(ROUTER).await.unwrap();
    let limits = Limits {
        max_reveal_rounds: 2,
        ..Limits::default()
    };

    let report = reveal_all(
        &session,
        &ForumLayout::default().reveal_controls,
        &limits,
        &Pacing::default(),
    )
    .await;

    assert_eq!(report.rounds, 2);
    assert_eq!(report.activations, 2);
    assert_eq!(session.clicks(), 2);
}

fn lazy_discussion() -> FakePage {
    let reply = |author: &str, body: &str| {
        format!(
            r#"<article data-testid="message">
                <span data-testid="author-name">{author}</span>
                <div data-testid="post-body"><p>{body}</p></div>
            </article>"#
        )
    };
    let head = format!(
        r#"<html><body>
        <h1 data-testid="discussion-title">Firmware update bricked my hub</h1>
        <article data-testid="message">
            <span data-testid="author-name">hubowner</span>
            <div data-testid="post-body"><p>The hub no longer boots.</p></div>
        </article>{}"#,
        reply("mod_anna", "Which firmware version?")
    );

    FakePage::new(format!("{head}</body></html>"))
        .on_scroll(format!(
            r#"{head}<button data-testid="show-more">Show more</button></body></html>"#
        ))
        .on_click(format!(
            "{head}{}</body></html>",
            reply("hubowner", "Version 4.2, installed last night.")
        ))
}

#[tokio::test]
async fn test_control_loaded_by_scrolling_is_revealed() {
    let session = FakeSession::new().page(ROUTER, lazy_discussion());
    session.navigate(ROUTER).await.unwrap();
    let layout = ForumLayout::default();

    let report = expand_fully(
        &session,
        &layout.reveal_controls,
        &Limits::default(),
        &Pacing::default(),
    )
    .await;

    assert_eq!(report.activations, 1);
    assert!(report.converged);
}

#[tokio::test]
async fn test_extract_detail_includes_reply_behind_lazy_control() {
    let session = FakeSession::new().page(ROUTER, lazy_discussion());

    let detail = extract_detail(
        &session,
        ROUTER,
        &ForumLayout::default(),
        &Heuristics::default(),
        &Limits::default(),
        &Pacing::default(),
    )
    .await
    .unwrap();

    assert_eq!(detail.content, "The hub no longer boots.");
    let replies: Vec<_> = detail.replies.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(
        replies,
        vec!["Which firmware version?", "Version 4.2, installed last night."]
    );
    assert_eq!(detail.replies[1].author, "hubowner");
}

#[tokio::test]
async fn test_extract_detail_expands_cleans_and_bounds_replies() {
    let session = FakeSession::new().page(ROUTER, collapsed_discussion());

    let detail = extract_detail(
        &session,
        ROUTER,
        &ForumLayout::default(),
        &Heuristics::default(),
        &Limits::default(),
        &Pacing::default(),
    )
    .await
    .unwrap();

    assert_eq!(detail.title, "Router drops connection");
    assert_eq!(detail.author, "netguy");
    assert_eq!(detail.author_role.as_deref(), Some("Contributor"));
    assert_eq!(detail.time, "Mar 1");
    assert_eq!(detail.content, "It drops every hour.");
    assert_eq!(detail.likes, 0);

    // UI-only reply dropped, inferred author kept, list cut to "2 Replies"
    assert_eq!(detail.replies.len(), 2);
    assert_eq!(detail.comments, 2);
    assert_eq!(detail.replies[0].author, "mod_anna");
    assert_eq!(detail.replies[0].content, "Please share your logs.");
    assert_eq!(detail.replies[0].likes, 1);
    assert_eq!(detail.replies[1].author, "janedoe92");
    assert_eq!(detail.replies[1].content, "same issue since the update");
}

#[tokio::test]
async fn test_extract_detail_without_markers_fails() {
    let session = FakeSession::new().page(
        ROUTER,
        FakePage::new("<html><body><p>Access denied</p></body></html>"),
    );

    let err = extract_detail(
        &session,
        ROUTER,
        &ForumLayout::default(),
        &Heuristics::default(),
        &Limits::default(),
        &Pacing::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, HarvestError::MissingContent { .. }));
}

#[tokio::test]
async fn test_extract_detail_keeps_greeting_unattributed() {
    let session = FakeSession::new().page(PRINTER, simple_discussion("Printer offline"));

    let detail = extract_detail(
        &session,
        PRINTER,
        &ForumLayout::default(),
        &Heuristics::default(),
        &Limits::default(),
        &Pacing::default(),
    )
    .await
    .unwrap();

    assert_eq!(detail.author, "");
    assert_eq!(detail.content, "Hi there, my printer shows offline");
    assert!(detail.replies.is_empty());
}

#[tokio::test]
async fn test_run_isolates_failures_and_applies_listing_counters() {
    let listing = listing_page(
        &[
            listing_row(ROUTER, "Router drops connection", "netguy", 1500, 12),
            listing_row(PRINTER, "Printer offline", "pat", 40, 1),
            listing_row("https://forum.example.com/t/gone/3", "Gone", "ghost", 5, 0),
        ],
        None,
    );
    let session = FakeSession::new()
        .page(LISTING, FakePage::new(listing))
        .page(ROUTER, collapsed_discussion())
        .page(PRINTER, simple_discussion("Printer offline"))
        .failing("https://forum.example.com/t/gone/3");
    let harvester = Harvester::new(
        &session,
        ForumLayout::default(),
        Heuristics::default(),
        Limits::default(),
        Pacing::default(),
    );

    let mut sink = Vec::new();
    let stats = harvester.run(LISTING, &mut sink).await.unwrap();

    assert_eq!(stats.discovered, 3);
    assert_eq!(stats.harvested, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.replies, 2);

    assert_eq!(sink.len(), 2);
    assert_eq!(sink[0].url, ROUTER);
    assert_eq!(sink[0].views, 1500);
    assert_eq!(sink[0].likes, 12);

    // The page gave no author, so the listing's is used
    assert_eq!(sink[1].url, PRINTER);
    assert_eq!(sink[1].author, "pat");
    assert_eq!(sink[1].likes, 1);
}

#[tokio::test]
async fn test_run_respects_discussion_cap() {
    let listing = listing_page(
        &[
            listing_row(ROUTER, "Router drops connection", "netguy", 1, 0),
            listing_row(PRINTER, "Printer offline", "pat", 1, 0),
        ],
        None,
    );
    let session = FakeSession::new()
        .page(LISTING, FakePage::new(listing))
        .page(ROUTER, collapsed_discussion())
        .page(PRINTER, simple_discussion("Printer offline"));
    let limits = Limits {
        max_discussions: Some(1),
        ..Limits::default()
    };
    let harvester = Harvester::new(
        &session,
        ForumLayout::default(),
        Heuristics::default(),
        limits,
        Pacing::default(),
    );

    let mut sink = Vec::new();
    let stats = harvester.run(LISTING, &mut sink).await.unwrap();

    assert_eq!(stats.discovered, 2);
    assert_eq!(stats.harvested, 1);
    assert!(!session.navigations().contains(&PRINTER.to_string()));
}

#[tokio::test]
async fn test_run_fails_when_listing_cannot_load() {
    let session = FakeSession::new().failing(LISTING);
    let harvester = Harvester::new(
        &session,
        ForumLayout::default(),
        Heuristics::default(),
        Limits::default(),
        Pacing::default(),
    );

    let mut sink = Vec::new();
    let err = harvester.run(LISTING, &mut sink).await.unwrap_err();

    assert!(matches!(err, HarvestError::StartPage { .. }));
    assert!(sink.is_empty());
}
