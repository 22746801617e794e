//! Text cleanup for extracted post bodies.
//!
//! Rendered post text arrives with the page's UI chrome mixed in: like and
//! reply widgets, reply counters, sort selectors, role badges, and the post's
//! own title/author/time echoed above the body. Everything here is a pure
//! string transformation so it can be tested without a browser.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::STRAY_COUNTER_DIGITS;

static STRAY_COUNTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^\d{{1,{STRAY_COUNTER_DIGITS}}}$")).expect("valid regex"));

/// Whole-line reply counters and sort selectors.
static UI_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:\d[\d,]*\s+repl(?:y|ies)|replies\s+sorted\s+by\b.*|sorted\s+by\s+(?:most|newest|oldest)\b.*|(?:most|newest|oldest)\s+(?:liked|recent))$",
    )
    .expect("valid regex")
});

/// Widget residue left inline once lines are joined: "Like", "Like12", "Reply".
static INLINE_WIDGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:Like\d*|Reply)\b").expect("valid regex"));

static INLINE_UI: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b\d[\d,]*\s+repl(?:y|ies)\b",
        r"(?i)\breplies\s+sorted\s+by\s+(?:most|newest|oldest)(?:\s+(?:liked|recent))?\b",
        r"(?i)\bsorted\s+by\s+(?:most|newest|oldest)(?:\s+(?:liked|recent))?\b",
        r"\b(?:Most|Newest|Oldest)\s+(?:Liked|Recent)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Leading username-like token, a separator, then the message. The token
/// ends on a word character so trailing punctuation stays a separator.
static LEADING_AUTHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^(\w[\w.\-]+\w)[\s,:;.!?\-]+(.+)$").expect("valid regex"));

/// Word tables driving the cleanup. Tuned to one forum layout; all three are
/// overridable from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heuristics {
    /// Lines exactly equal (case-insensitive) to one of these are dropped.
    pub noise_words: Vec<String>,
    /// Lines containing one of these (case-insensitive) are dropped.
    pub role_tokens: Vec<String>,
    /// Leading words never taken as an inferred author.
    pub author_blacklist: Vec<String>,
}

impl Default for Heuristics {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(ToString::to_string).collect();
        Self {
            noise_words: owned(&[
                "tag",
                "like",
                "reply",
                "copy link",
                "follow",
                "report",
                "marked as solution",
                "solved",
            ]),
            role_tokens: owned(&["contributor", "ambassador", "support team"]),
            author_blacklist: owned(&["Hi", "Has", "I", "We", "Thanks", "Hey", "Hello"]),
        }
    }
}

impl Heuristics {
    fn is_noise(&self, line: &str) -> bool {
        self.noise_words.iter().any(|w| w.eq_ignore_ascii_case(line))
    }

    fn has_role_token(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.role_tokens
            .iter()
            .any(|t| !t.is_empty() && lower.contains(&t.to_lowercase()))
    }

    fn is_blacklisted_opener(&self, token: &str) -> bool {
        self.author_blacklist
            .iter()
            .any(|w| w.eq_ignore_ascii_case(token))
    }
}

/// Metadata already read structurally, which the renderer echoes into the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct KnownFields<'a> {
    pub title: &'a str,
    pub author: &'a str,
    pub time: &'a str,
    pub role: &'a str,
}

impl KnownFields<'_> {
    fn echoes(&self, line: &str) -> bool {
        [self.title, self.author, self.time, self.role]
            .iter()
            .any(|known| !known.is_empty() && known.trim() == line)
    }
}

/// Strip UI chrome and echoed metadata from rendered post text.
#[must_use]
pub fn clean_content(raw: &str, known: &KnownFields<'_>, heuristics: &Heuristics) -> String {
    let kept: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !known.echoes(line))
        .filter(|line| !heuristics.is_noise(line))
        .filter(|line| !STRAY_COUNTER.is_match(line))
        .filter(|line| !heuristics.has_role_token(line))
        .filter(|line| !UI_LINE.is_match(line))
        .collect();

    // Counters go first so "3 Reply" is not left as a bare "3"
    let mut text = kept.join(" ");
    for pattern in INLINE_UI.iter() {
        text = pattern.replace_all(&text, " ").into_owned();
    }
    let text = INLINE_WIDGET.replace_all(&text, " ");

    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Outcome of looking for an author name at the start of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    pub author: Option<String>,
    pub content: String,
}

/// Take a leading username-like token as the author when the page gave none.
///
/// Common openers ("Hi", "Thanks", ...) are not usernames; in that case, or
/// when nothing matches, the content is returned whole and unattributed.
#[must_use]
pub fn infer_author(content: &str, heuristics: &Heuristics) -> Attribution {
    let unattributed = || Attribution {
        author: None,
        content: content.to_string(),
    };

    let Some(caps) = LEADING_AUTHOR.captures(content) else {
        return unattributed();
    };

    let token = &caps[1];
    let rest = caps[2].trim();
    if rest.is_empty() || heuristics.is_blacklisted_opener(token) {
        return unattributed();
    }

    Attribution {
        author: Some(token.to_string()),
        content: rest.to_string(),
    }
}

/// A post body after cleanup and attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPost {
    pub author: String,
    pub content: String,
}

/// Clean a post and fill in its author if structural extraction found none.
///
/// Returns `None` when both author and content end up empty: such a post is
/// leftover UI, not a real message.
#[must_use]
pub fn normalize_post(
    raw: &str,
    author: &str,
    known: &KnownFields<'_>,
    heuristics: &Heuristics,
) -> Option<NormalizedPost> {
    let cleaned = clean_content(raw, known, heuristics);
    let author = author.trim();

    let post = if author.is_empty() {
        let attribution = infer_author(&cleaned, heuristics);
        NormalizedPost {
            author: attribution.author.unwrap_or_default(),
            content: attribution.content,
        }
    } else {
        NormalizedPost {
            author: author.to_string(),
            content: cleaned,
        }
    };

    if post.author.is_empty() && post.content.is_empty() {
        None
    } else {
        Some(post)
    }
}
