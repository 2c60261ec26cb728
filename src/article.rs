//! Article records exchanged between the API, the ingestion pipeline and the
//! store.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Stored article, without its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Primary key.
    pub id: i64,
    /// Headline.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Optional byline.
    pub author: Option<String>,
    /// Optional category label.
    pub category: Option<String>,
    /// Publication time, if known.
    pub published_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Text the embedding is computed from.
    pub fn embedding_text(&self) -> String {
        embedding_text(&self.title, &self.content)
    }

    /// Applies a partial update, keeping current values for absent fields.
    ///
    /// A present but unparseable `published_at` clears the timestamp.
    pub fn apply(&mut self, patch: ArticlePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(author) = patch.author {
            self.author = Some(author);
        }
        if let Some(category) = patch.category {
            self.category = Some(category);
        }
        if let Some(raw) = patch.published_at {
            self.published_at = parse_timestamp(&raw);
        }
    }
}

/// Fields of an article that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArticleDraft {
    /// Headline; must not be empty.
    pub title: String,
    /// Body text; must not be empty.
    pub content: String,
    /// Optional byline.
    #[serde(default)]
    pub author: Option<String>,
    /// Optional category label.
    #[serde(default)]
    pub category: Option<String>,
    /// Raw timestamp as submitted; parsed leniently.
    #[serde(default)]
    pub published_at: Option<String>,
}

impl ArticleDraft {
    /// Rejects drafts with an empty title or body.
    pub fn validate(&self) -> Result<()> {
        if self.title.is_empty() {
            return Err(Error::EmptyField { field: "title" });
        }
        if self.content.is_empty() {
            return Err(Error::EmptyField { field: "content" });
        }
        Ok(())
    }

    /// Text the embedding is computed from.
    pub fn embedding_text(&self) -> String {
        embedding_text(&self.title, &self.content)
    }

    /// Parsed publication time; unparseable input becomes `None`.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at.as_deref().and_then(parse_timestamp)
    }
}

/// Partial update payload. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ArticlePatch {
    /// New headline.
    pub title: Option<String>,
    /// New body text.
    pub content: Option<String>,
    /// New byline.
    pub author: Option<String>,
    /// New category label.
    pub category: Option<String>,
    /// New publication time; unparseable text clears it.
    pub published_at: Option<String>,
}

/// Article paired with its embedding, as buffered by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedArticle {
    /// The article row.
    pub article: Article,
    /// Unit-length (or zero) embedding of `title + "\n" + content`.
    pub embedding: Vec<f32>,
}

/// `title + "\n" + content`, the canonical embedding input.
pub fn embedding_text(title: &str, content: &str) -> String {
    format!("{title}\n{content}")
}

/// Lenient ISO-8601 parsing.
///
/// Accepts RFC 3339 (including a trailing `Z`), date-times with either `T` or a
/// space separator and optional offset, and bare dates. Values without an
/// offset are taken as UTC. Anything else yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"] {
        if let Ok(ts) = DateTime::parse_from_str(raw, format) {
            return Some(ts.with_timezone(&Utc));
        }
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).single().expect("valid")
    }

    #[test]
    fn parses_common_iso_forms() {
        let expected = utc(2024, 3, 1, 12, 30, 0);
        for raw in [
            "2024-03-01T12:30:00Z",
            "2024-03-01T12:30:00+00:00",
            "2024-03-01T21:30:00+09:00",
            "2024-03-01 12:30:00",
            "2024-03-01T12:30:00",
            "2024-03-01T12:30",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "{raw}");
        }
        assert_eq!(parse_timestamp("2024-03-01"), Some(utc(2024, 3, 1, 0, 0, 0)));
    }

    #[test]
    fn garbage_timestamps_become_none() {
        for raw in ["", "   ", "yesterday", "2024-13-45", "01/03/2024"] {
            assert_eq!(parse_timestamp(raw), None, "{raw}");
        }
    }

    #[test]
    fn patch_keeps_unset_fields() {
        let mut article = Article {
            id: 7,
            title: "Old".into(),
            content: "Body".into(),
            author: Some("ann".into()),
            category: None,
            published_at: Some(utc(2020, 1, 1, 0, 0, 0)),
        };
        article.apply(ArticlePatch {
            title: Some("New".into()),
            published_at: Some("not a date".into()),
            ..ArticlePatch::default()
        });
        assert_eq!(article.title, "New");
        assert_eq!(article.content, "Body");
        assert_eq!(article.author.as_deref(), Some("ann"));
        assert_eq!(article.published_at, None);
        assert_eq!(article.embedding_text(), "New\nBody");
    }

    #[test]
    fn drafts_need_title_and_content() {
        let mut draft = ArticleDraft {
            title: "t".into(),
            content: String::new(),
            author: None,
            category: None,
            published_at: Some("2024-01-02".into()),
        };
        assert!(matches!(
            draft.validate(),
            Err(Error::EmptyField { field: "content" })
        ));
        draft.content = "c".into();
        assert!(draft.validate().is_ok());
        assert_eq!(draft.published_at(), Some(utc(2024, 1, 2, 0, 0, 0)));
    }
}
