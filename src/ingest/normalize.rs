// src/ingest/normalize.rs
//! Map one item/entry fragment plus its owning source to an `Article`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::ingest::extract::{extract_attr, extract_tag, strip_tags};
use crate::ingest::types::{Article, ArticleOrigin};
use crate::sources::Source;

pub const SNIPPET_MAX_CHARS: usize = 150;
pub const SNIPPET_PLACEHOLDER: &str = "No summary available.";

/// Decode entities, drop markup that was hidden behind them, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    // 1) HTML entity decode
    let decoded = html_escape::decode_html_entities(s);

    // 2) Strip tags that only became visible after decoding (`&lt;p&gt;`)
    let stripped = strip_tags(&decoded);

    // 3) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

/// Hard cut at `max` characters; never splits a UTF-8 sequence.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Parse the date shapes feeds actually emit: RFC 2822 (RSS), RFC 3339 (Atom),
/// and a few bare ISO-ish forms.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    // chrono rejects a weekday that disagrees with the date; feeds get it wrong often enough.
    if let Some(dt) = std::iter::once(s)
        .chain(without_weekday(s))
        .find_map(|v| DateTime::parse_from_rfc2822(v).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

/// `"Tue, 01 Jan 2024 ..."` -> `"01 Jan 2024 ..."`.
fn without_weekday(s: &str) -> Option<&str> {
    let (head, rest) = s.split_once(',')?;
    let head = head.trim();
    let is_day = head.len() == 3 && head.chars().all(|c| c.is_ascii_alphabetic());
    is_day.then(|| rest.trim_start())
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| clean_text(&v)).filter(|v| !v.is_empty())
}

/// Build an `Article` from one fragment, or `None` when title or link is missing.
///
/// `now` is used when no date tag parses.
pub fn normalize_item(fragment: &str, source: &Source, now: DateTime<Utc>) -> Option<Article> {
    let title = non_empty(extract_tag(fragment, "title"))?;
    let link = non_empty(extract_tag(fragment, "link"))
        .or_else(|| non_empty(extract_attr(fragment, "link", "href")))?;

    let date = ["pubDate", "updated"]
        .iter()
        .filter_map(|tag| extract_tag(fragment, tag))
        .find_map(|raw| parse_feed_date(&raw))
        .unwrap_or(now);

    let snippet = ["description", "summary"]
        .iter()
        .find_map(|tag| non_empty(extract_tag(fragment, tag)))
        .map(|s| truncate_chars(&s, SNIPPET_MAX_CHARS))
        .unwrap_or_else(|| SNIPPET_PLACEHOLDER.to_string());

    Some(Article {
        source_name: source.name.clone(),
        source_id: ArticleOrigin::Source(source.id),
        title,
        link,
        date,
        snippet,
    })
}
