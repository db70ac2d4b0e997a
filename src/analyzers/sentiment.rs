//! News and social sentiment aggregation.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use crate::scoring::{Factor, SubScore};
use crate::{Direction, SignalError};

/// Known sentiment tags. Anything else lands in [`SentimentItem::extra`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SentimentTag {
    Earnings,
    Analyst,
    Macro,
    Regulatory,
    Merger,
    Insider,
    Social,
    Product,
}

impl SentimentTag {
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentTag::Earnings => "earnings",
            SentimentTag::Analyst => "analyst",
            SentimentTag::Macro => "macro",
            SentimentTag::Regulatory => "regulatory",
            SentimentTag::Merger => "merger",
            SentimentTag::Insider => "insider",
            SentimentTag::Social => "social",
            SentimentTag::Product => "product",
        }
    }
}

impl FromStr for SentimentTag {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "earnings" => Ok(SentimentTag::Earnings),
            "analyst" | "rating" | "upgrade" | "downgrade" => Ok(SentimentTag::Analyst),
            "macro" | "economy" | "fed" => Ok(SentimentTag::Macro),
            "regulatory" | "sec" | "legal" => Ok(SentimentTag::Regulatory),
            "merger" | "acquisition" | "m&a" => Ok(SentimentTag::Merger),
            "insider" => Ok(SentimentTag::Insider),
            "social" | "reddit" | "twitter" => Ok(SentimentTag::Social),
            "product" | "launch" => Ok(SentimentTag::Product),
            _ => Err(SignalError::InvalidValue("unknown sentiment tag")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SentimentItem {
    /// Unix seconds
    pub time: i64,
    #[serde(default)]
    pub headline: String,
    /// −1.0..=1.0
    pub score: f64,
    /// 0.0..=1.0
    pub relevance: f64,
    #[serde(default)]
    pub tags: BTreeSet<SentimentTag>,
    /// Tags outside the known set, with their raw values
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl SentimentItem {
    pub fn new(time: i64, score: f64, relevance: f64) -> Self {
        Self {
            time,
            headline: String::new(),
            score,
            relevance,
            tags: BTreeSet::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_headline(mut self, headline: impl Into<String>) -> Self {
        self.headline = headline.into();
        self
    }

    pub fn with_tag(mut self, tag: SentimentTag) -> Self {
        self.tags.insert(tag);
        self
    }

    /// Route a feed's free-form tag into the known set or the overflow map
    pub fn with_raw_tag(mut self, name: &str, value: impl Into<String>) -> Self {
        match name.parse::<SentimentTag>() {
            Ok(tag) => {
                self.tags.insert(tag);
            }
            Err(_) => {
                self.extra.insert(name.to_string(), value.into());
            }
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SentimentReport {
    pub item_count: usize,
    /// Relevance-weighted mean score × 100, 0 without relevance
    pub weighted_sentiment: f64,
    pub trend: Direction,
    /// Items per hour over the items' time span
    pub velocity: f64,
    pub tag_counts: BTreeMap<SentimentTag, usize>,
    /// Items carrying at least one tag outside the known set
    pub untagged_extra: usize,
    pub score: SubScore,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SentimentAnalyzer {
    /// |weighted sentiment| beyond this sets the trend
    pub trend_threshold: f64,
    pub strong_sentiment: f64,
    pub fast_velocity: f64,
    pub active_velocity: f64,
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self {
            trend_threshold: 20.0,
            strong_sentiment: 40.0,
            fast_velocity: 5.0,
            active_velocity: 2.0,
        }
    }
}

impl SentimentAnalyzer {
    pub fn analyze(&self, items: Option<&[SentimentItem]>) -> SentimentReport {
        let items = items.unwrap_or(&[]);

        let total_relevance: f64 = items.iter().map(|i| i.relevance.clamp(0.0, 1.0)).sum();
        let weighted_sentiment = if total_relevance > 0.0 {
            items
                .iter()
                .map(|i| i.score.clamp(-1.0, 1.0) * i.relevance.clamp(0.0, 1.0))
                .sum::<f64>()
                / total_relevance
                * 100.0
        } else {
            0.0
        };

        let trend = if weighted_sentiment > self.trend_threshold {
            Direction::Bullish
        } else if weighted_sentiment < -self.trend_threshold {
            Direction::Bearish
        } else {
            Direction::Neutral
        };

        let velocity = match (items.iter().map(|i| i.time).min(), items.iter().map(|i| i.time).max()) {
            (Some(first), Some(last)) if last > first => {
                items.len() as f64 / ((last - first) as f64 / 3600.0)
            }
            _ => items.len() as f64,
        };

        let mut tag_counts = BTreeMap::new();
        for tag in items.iter().flat_map(|i| i.tags.iter()) {
            *tag_counts.entry(*tag).or_insert(0) += 1;
        }
        let untagged_extra = items.iter().filter(|i| !i.extra.is_empty()).count();

        let mut value = 0.0;
        if weighted_sentiment.abs() > self.strong_sentiment {
            value += 2.0;
        } else if weighted_sentiment.abs() > self.trend_threshold {
            value += 1.0;
        }
        if velocity > self.fast_velocity {
            value += 2.0;
        } else if velocity > self.active_velocity {
            value += 1.0;
        }

        SentimentReport {
            item_count: items.len(),
            weighted_sentiment,
            trend,
            velocity,
            tag_counts,
            untagged_extra,
            score: SubScore::new(Factor::Sentiment, value, trend),
        }
    }
}
