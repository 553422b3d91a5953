// src/ingest/segment.rs
//! Split a raw feed document into `<item>` (RSS) and `<entry>` (Atom) fragments.

use once_cell::sync::OnceCell;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Item,
    Entry,
}

/// Body of one `<item>…</item>` or `<entry>…</entry>` block, borrowed from the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemFragment<'a> {
    pub kind: ItemKind,
    pub body: &'a str,
}

fn item_regex() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    // One alternation per block kind so each open tag pairs with its own close tag
    // and mixed documents still come out in document order. Self-closing tags never open a block.
    RE.get_or_init(|| {
        Regex::new(
            r"(?is)<item(?:\s+|\s[^>]*?[^/>])?>(.*?)</item\s*>|<entry(?:\s+|\s[^>]*?[^/>])?>(.*?)</entry\s*>",
        )
        .unwrap()
    })
}

/// Lazily yield every item/entry block of `doc`, in document order.
///
/// The document itself is never validated; zero fragments is a normal result.
pub fn segment(doc: &str) -> impl Iterator<Item = ItemFragment<'_>> + '_ {
    item_regex().captures_iter(doc).filter_map(|caps| {
        if let Some(m) = caps.get(1) {
            Some(ItemFragment {
                kind: ItemKind::Item,
                body: m.as_str(),
            })
        } else {
            caps.get(2).map(|m| ItemFragment {
                kind: ItemKind::Entry,
                body: m.as_str(),
            })
        }
    })
}
