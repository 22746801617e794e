//! Helpers for reading a rendered DOM snapshot.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use url::Url;

/// Elements whose text never reaches the reader.
const SKIPPED_TAGS: &[&str] = &["head", "script", "style", "noscript", "template"];

/// Elements that flow within a line instead of starting a new one.
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "data", "em", "i", "img", "kbd", "label",
    "mark", "q", "s", "samp", "small", "span", "strong", "sub", "sup", "svg", "time", "u", "var",
];

static COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*([km])?\b").expect("valid regex"));

/// Text of an element laid out roughly like `innerText`: block elements and
/// `<br>` break lines, inline elements and whitespace runs collapse to single
/// spaces, and blank lines are dropped.
#[must_use]
pub fn rendered_text(element: ElementRef<'_>) -> String {
    let mut buffer = String::new();
    walk(element, &mut buffer);
    buffer
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn walk(element: ElementRef<'_>, buffer: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let node = child_element.value();
            let name = node.name();
            if SKIPPED_TAGS.contains(&name) || node.attr("hidden").is_some() {
                continue;
            }
            if name == "br" {
                buffer.push('\n');
                continue;
            }
            let inline = INLINE_TAGS.contains(&name);
            if !inline {
                buffer.push('\n');
            }
            walk(child_element, buffer);
            if !inline {
                buffer.push('\n');
            }
        } else if let Some(text) = child.value().as_text() {
            push_collapsed(buffer, text);
        }
    }
}

fn push_collapsed(buffer: &mut String, text: &str) {
    let mut in_space = buffer.is_empty() || buffer.ends_with(char::is_whitespace);
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                buffer.push(' ');
                in_space = true;
            }
        } else {
            buffer.push(c);
            in_space = false;
        }
    }
}

/// Resolve `href` against `base` into an absolute http(s) URL without fragment.
#[must_use]
pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }

    let mut url = Url::parse(base).ok()?.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

/// Parse a counter label such as `"1,204"`, `"3.4k"`, `"2M"` or `"17 views"`.
///
/// Labels without a number count as zero.
#[must_use]
pub fn parse_count(label: &str) -> u64 {
    let Some(caps) = COUNT.captures(label) else {
        return 0;
    };

    let number: f64 = caps[1].replace(',', "").parse().unwrap_or(0.0);
    let multiplier = match caps.get(2).map(|m| m.as_str()) {
        Some("k" | "K") => 1_000.0,
        Some("m" | "M") => 1_000_000.0,
        _ => 1.0,
    };

    (number * multiplier).round() as u64
}
