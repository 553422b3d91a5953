// src/ingest/extract.rs
//! Tag extraction for loosely-structured feed markup.
//!
//! This is deliberately not an XML parser. The first opening tag whose name
//! matches (case-insensitive, any attributes) is paired with the *nearest*
//! closing tag of the same name, and whatever sits in between is returned as
//! plain text. Absence is the common case and is reported as `None`.

use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashMap;
use std::sync::RwLock;

static PATTERNS: OnceCell<RwLock<HashMap<String, Regex>>> = OnceCell::new();

/// Compiled patterns are keyed by lowercased tag (or `tag@attr`) and shared.
fn cached_pattern(key: String, build: impl FnOnce() -> Option<Regex>) -> Option<Regex> {
    let cache = PATTERNS.get_or_init(|| RwLock::new(HashMap::new()));
    if let Some(re) = cache.read().ok().and_then(|m| m.get(&key).cloned()) {
        return Some(re);
    }
    let re = build()?;
    if let Ok(mut m) = cache.write() {
        m.insert(key, re.clone());
    }
    Some(re)
}

fn tag_pattern(tag: &str) -> Option<Regex> {
    let key = tag.to_ascii_lowercase();
    cached_pattern(key, || {
        let name = regex::escape(tag);
        // Opening tag: bare, or followed by attributes that do not end in `/`
        // (a self-closing tag has no content to extract).
        Regex::new(&format!(
            r"(?is)<{name}(?:\s+|\s[^>]*?[^/>])?>(.*?)</{name}\s*>"
        ))
        .ok()
    })
}

fn attr_pattern(tag: &str, attr: &str) -> Option<Regex> {
    let key = format!("{}@{}", tag.to_ascii_lowercase(), attr.to_ascii_lowercase());
    cached_pattern(key, || {
        let name = regex::escape(tag);
        let attr = regex::escape(attr);
        Regex::new(&format!(
            r#"(?is)<{name}\s(?:[^>]*?\s)?{attr}\s*=\s*(?:"([^"]*)"|'([^']*)')"#
        ))
        .ok()
    })
}

/// Return the trimmed text of the first `<tag ...>...</tag>` pair in `fragment`.
///
/// Inline markup inside the captured text (`<b>`, `<a href>`, ...) is removed
/// and CDATA markers are unwrapped. A tag that is present but empty yields
/// `Some("")`; callers decide whether that counts as missing.
pub fn extract_tag(fragment: &str, tag: &str) -> Option<String> {
    let re = tag_pattern(tag)?;
    let inner = re.captures(fragment)?.get(1)?.as_str();
    Some(strip_tags(&unwrap_cdata(inner)).trim().to_string())
}

/// Return the value of `attr` on the first `<tag ...>` opening tag, if any.
pub fn extract_attr(fragment: &str, tag: &str, attr: &str) -> Option<String> {
    let re = attr_pattern(tag, attr)?;
    let caps = re.captures(fragment)?;
    let value = caps.get(1).or_else(|| caps.get(2))?.as_str().trim();
    Some(value.to_string())
}

/// Remove every `<...>` tag, leaving the text between them.
pub fn strip_tags(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re = RE_TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]*>").unwrap());
    re.replace_all(s, "").into_owned()
}

fn unwrap_cdata(s: &str) -> String {
    static RE_CDATA: OnceCell<Regex> = OnceCell::new();
    let re = RE_CDATA.get_or_init(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());
    re.replace_all(s, "$1").into_owned()
}
