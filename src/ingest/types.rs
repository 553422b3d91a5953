// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ingest::fetch::FetchError;

/// Where an article came from: a registered source, or typed in by hand in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleOrigin {
    Source(u64),
    Manual,
}

const MANUAL_TAG: &str = "MANUAL";

impl Serialize for ArticleOrigin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ArticleOrigin::Source(id) => serializer.serialize_u64(*id),
            ArticleOrigin::Manual => serializer.serialize_str(MANUAL_TAG),
        }
    }
}

impl<'de> Deserialize<'de> for ArticleOrigin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Id(u64),
            Tag(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Id(id) => Ok(ArticleOrigin::Source(id)),
            Raw::Tag(t) if t == MANUAL_TAG => Ok(ArticleOrigin::Manual),
            Raw::Tag(t) => Err(serde::de::Error::custom(format!(
                "sourceId must be a number or \"{MANUAL_TAG}\", got {t:?}"
            ))),
        }
    }
}

/// One normalized feed item, ready for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub source_name: String,
    pub source_id: ArticleOrigin,
    pub title: String,
    pub link: String,
    /// Serialized as RFC 3339.
    pub date: DateTime<Utc>,
    pub snippet: String,
}

/// Transport seam for the aggregation pipeline; production uses `HttpFetcher`.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article(origin: ArticleOrigin) -> Article {
        Article {
            source_name: "Example".into(),
            source_id: origin,
            title: "T".into(),
            link: "https://example.org/t".into(),
            date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            snippet: "S".into(),
        }
    }

    #[test]
    fn serializes_with_camel_case_keys_and_numeric_id() {
        let v = serde_json::to_value(article(ArticleOrigin::Source(7))).unwrap();
        assert_eq!(v["sourceName"], "Example");
        assert_eq!(v["sourceId"], 7);
        assert_eq!(v["date"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn manual_origin_uses_sentinel_string() {
        let v = serde_json::to_value(article(ArticleOrigin::Manual)).unwrap();
        assert_eq!(v["sourceId"], "MANUAL");
        let back: Article = serde_json::from_value(v).unwrap();
        assert_eq!(back.source_id, ArticleOrigin::Manual);
    }

    #[test]
    fn unknown_origin_string_is_rejected() {
        let r: Result<ArticleOrigin, _> = serde_json::from_str("\"AUTO\"");
        assert!(r.is_err());
    }
}
