//! In-memory page session for integration tests.
//!
//! Each page is a sequence of HTML stages. A stage is entered from the one
//! before it by a click on a matching control or by a scroll, whichever the
//! stage was registered with, which is enough to model "show more" buttons,
//! "load more" buttons and infinite scroll. Clicked elements stay marked
//! until `reset_activations`, like the browser session.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use discussion_harvester::harvester::dom::rendered_text;
use discussion_harvester::session::{PageSession, RevealQuery, SessionError};
use scraper::{Html, Selector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Load,
    Click,
    Scroll,
}

#[derive(Debug, Clone)]
pub struct FakePage {
    stages: Vec<(Trigger, String)>,
}

impl FakePage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            stages: vec![(Trigger::Load, html.into())],
        }
    }

    /// Stage reached by clicking a control present in the previous stage.
    pub fn on_click(mut self, html: impl Into<String>) -> Self {
        self.stages.push((Trigger::Click, html.into()));
        self
    }

    /// Stage reached by scrolling the previous stage.
    pub fn on_scroll(mut self, html: impl Into<String>) -> Self {
        self.stages.push((Trigger::Scroll, html.into()));
        self
    }
}

#[derive(Debug, Default)]
struct Cursor {
    url: Option<String>,
    stage: usize,
    navigations: Vec<String>,
    clicks: usize,
    snapshots: usize,
    /// Elements clicked since the last reset, keyed by stage and position.
    activated: HashSet<(usize, usize)>,
}

#[derive(Debug, Default)]
pub struct FakeSession {
    pages: HashMap<String, FakePage>,
    failing: HashSet<String>,
    redirects: HashMap<String, String>,
    cursor: Mutex<Cursor>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// Navigating to `url` fails.
    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// Navigating to `from` lands on `to`.
    pub fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.cursor.lock().unwrap().navigations.clone()
    }

    pub fn clicks(&self) -> usize {
        self.cursor.lock().unwrap().clicks
    }

    pub fn snapshots(&self) -> usize {
        self.cursor.lock().unwrap().snapshots
    }

    fn current_html(&self) -> String {
        let cursor = self.cursor.lock().unwrap();
        cursor
            .url
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .map(|page| page.stages[cursor.stage].1.clone())
            .unwrap_or_default()
    }

    fn advance(&self, trigger: Trigger) {
        let mut cursor = self.cursor.lock().unwrap();
        let Some(page) = cursor.url.as_ref().and_then(|url| self.pages.get(url)) else {
            return;
        };
        if page
            .stages
            .get(cursor.stage + 1)
            .is_some_and(|(next, _)| *next == trigger)
        {
            cursor.stage += 1;
        }
    }

    fn matching_texts(&self, selector: &str) -> Result<Vec<String>, SessionError> {
        let selector =
            Selector::parse(selector).map_err(|e| SessionError::Script(format!("{e:?}")))?;
        let document = Html::parse_document(&self.current_html());
        Ok(document.select(&selector).map(rendered_text).collect())
    }
}

#[async_trait]
impl PageSession for FakeSession {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        let mut cursor = self.cursor.lock().unwrap();
        cursor.navigations.push(url.to_string());
        let landed = self.redirects.get(url).map_or(url, String::as_str);
        if self.failing.contains(url) || !self.pages.contains_key(landed) {
            return Err(SessionError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        cursor.url = Some(landed.to_string());
        cursor.stage = 0;
        cursor.activated.clear();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        Ok(self.cursor.lock().unwrap().url.clone().unwrap_or_default())
    }

    async fn wait_for(&self, selector: &str, _timeout: Duration) -> Result<bool, SessionError> {
        Ok(!self.matching_texts(selector)?.is_empty())
    }

    async fn count(&self, selector: &str) -> Result<usize, SessionError> {
        Ok(self.matching_texts(selector)?.len())
    }

    async fn visible_texts(&self, selector: &str) -> Result<Vec<String>, SessionError> {
        self.matching_texts(selector)
    }

    async fn click_visible(&self, query: &RevealQuery) -> Result<usize, SessionError> {
        let selector =
            Selector::parse(&query.selector).map_err(|e| SessionError::Script(format!("{e:?}")))?;
        let document = Html::parse_document(&self.current_html());
        let all = Selector::parse("*").unwrap();
        let positions: Vec<usize> = document
            .select(&selector)
            .filter(|el| query.matches_text(&rendered_text(*el)))
            .filter_map(|el| document.select(&all).position(|other| other.id() == el.id()))
            .collect();

        let activated = {
            let mut cursor = self.cursor.lock().unwrap();
            let stage = cursor.stage;
            let fresh = positions
                .into_iter()
                .filter(|position| cursor.activated.insert((stage, *position)))
                .count();
            cursor.clicks += fresh;
            fresh
        };
        if activated > 0 {
            self.advance(Trigger::Click);
        }
        Ok(activated)
    }

    async fn reset_activations(&self) -> Result<(), SessionError> {
        self.cursor.lock().unwrap().activated.clear();
        Ok(())
    }

    async fn scroll_by(&self, _dy: i64) -> Result<(), SessionError> {
        self.advance(Trigger::Scroll);
        Ok(())
    }

    async fn scroll_height(&self) -> Result<u64, SessionError> {
        Ok(1000 * (self.cursor.lock().unwrap().stage as u64 + 1))
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, SessionError> {
        Err(SessionError::Script(format!("scripts are not run here: {script}")))
    }

    async fn snapshot(&self) -> Result<String, SessionError> {
        self.cursor.lock().unwrap().snapshots += 1;
        Ok(self.current_html())
    }
}

/// A listing row in the layout's primary convention.
pub fn listing_row(url: &str, title: &str, author: &str, views: u64, likes: u64) -> String {
    format!(
        r#"<li data-testid="discussion-item">
            <a data-testid="discussion-link" href="{url}">
                <span data-testid="discussion-title">{title}</span>
            </a>
            <span data-testid="author-name">{author}</span>
            <time>1 day ago</time>
            <span data-testid="views">{views}</span>
            <span data-testid="likes">{likes}</span>
            <span data-testid="replies">2</span>
        </li>"#
    )
}

/// A listing page with the given rows and optional next-page link.
pub fn listing_page(rows: &[String], next: Option<&str>) -> String {
    let next = next
        .map(|href| format!(r#"<nav><a rel="next" href="{href}">Next</a></nav>"#))
        .unwrap_or_default();
    format!(
        r#"<html><body><ul data-testid="discussion-list">{}</ul>{next}</body></html>"#,
        rows.concat()
    )
}
