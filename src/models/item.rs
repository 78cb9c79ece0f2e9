// src/models/item.rs

//! Catalog item data structures.

use serde::{Deserialize, Serialize};

/// Rating block as reported by the catalog API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rating {
    #[serde(default)]
    pub score: Option<f64>,

    #[serde(default)]
    pub rank: Option<u32>,

    /// Number of ratings behind the score
    #[serde(default)]
    pub total: Option<u64>,
}

/// One subject as it appears in a search page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSubject {
    #[serde(default)]
    pub id: u64,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub name_cn: String,

    #[serde(default)]
    pub rating: Rating,

    #[serde(default)]
    pub nsfw: bool,

    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub summary: Option<String>,
}

/// A catalog entry flowing through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// Catalog identifier, unique within a run
    pub id: u64,

    /// Original name
    pub name: String,

    /// Localized name, preferred for display when present
    #[serde(default)]
    pub name_cn: String,

    /// Quality metric; zero when the catalog has none
    #[serde(default)]
    pub score: f64,

    /// Rank reported by the catalog at fetch time; zero when unranked
    #[serde(rename = "rank", default)]
    pub source_rank: u32,

    #[serde(default)]
    pub rating_total: u64,

    /// Age/content gated
    #[serde(rename = "nsfw", default)]
    pub restricted: bool,

    #[serde(default)]
    pub date: String,

    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub summary: String,

    /// 1-based position assigned by the ranker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_position: Option<u32>,
}

impl Item {
    /// Localized name if present, otherwise the original name.
    pub fn display_name(&self) -> &str {
        if self.name_cn.trim().is_empty() {
            &self.name
        } else {
            &self.name_cn
        }
    }
}

impl From<RawSubject> for Item {
    fn from(raw: RawSubject) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            name_cn: raw.name_cn,
            score: raw.rating.score.unwrap_or(0.0),
            source_rank: raw.rating.rank.unwrap_or(0),
            rating_total: raw.rating.total.unwrap_or(0),
            restricted: raw.nsfw,
            date: raw.date.unwrap_or_default(),
            image: raw.image.unwrap_or_default(),
            summary: raw.summary.unwrap_or_default(),
            rank_position: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_subject_fills_sentinels() {
        let raw: RawSubject = serde_json::from_str(
            r#"{"id": 42, "name": "Foo", "name_cn": "", "rating": {"score": null}, "nsfw": true}"#,
        )
        .unwrap();

        let item = Item::from(raw);
        assert_eq!(item.id, 42);
        assert_eq!(item.score, 0.0);
        assert_eq!(item.source_rank, 0);
        assert!(item.restricted);
        assert!(item.rank_position.is_none());
    }

    #[test]
    fn test_display_name_prefers_localized() {
        let mut item = Item::from(RawSubject {
            id: 1,
            name: "Original".into(),
            name_cn: "本地".into(),
            ..RawSubject::default()
        });
        assert_eq!(item.display_name(), "本地");

        item.name_cn.clear();
        assert_eq!(item.display_name(), "Original");
    }
}
