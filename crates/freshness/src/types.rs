use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scores at or above this are a confident purchase.
pub const BUY_THRESHOLD: u8 = 75;
/// Scores at or above this (and below [`BUY_THRESHOLD`]) need a closer look.
pub const CHECK_THRESHOLD: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Buy,
    Check,
    Avoid,
}

impl Recommendation {
    pub fn from_score(score: u8) -> Self {
        if score >= BUY_THRESHOLD {
            Recommendation::Buy
        } else if score >= CHECK_THRESHOLD {
            Recommendation::Check
        } else {
            Recommendation::Avoid
        }
    }

    /// Anything outside the three known values becomes `Check`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "buy" => Recommendation::Buy,
            "avoid" => Recommendation::Avoid,
            _ => Recommendation::Check,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Buy => "buy",
            Recommendation::Check => "check",
            Recommendation::Avoid => "avoid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristics {
    pub color: String,
    pub texture: String,
    pub blemishes: String,
    pub ripeness: String,
}

pub const DEFAULT_COLOR: &str = "Natural";
pub const DEFAULT_TEXTURE: &str = "Standard";
pub const DEFAULT_BLEMISHES: &str = "None visible";
pub const DEFAULT_RIPENESS: &str = "Good";

impl Default for Characteristics {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR.to_string(),
            texture: DEFAULT_TEXTURE.to_string(),
            blemishes: DEFAULT_BLEMISHES.to_string(),
            ripeness: DEFAULT_RIPENESS.to_string(),
        }
    }
}

/// Placement of an item, every field a percentage of the image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NutritionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vitamins: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minerals: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefits: Option<String>,
}

impl NutritionInfo {
    pub fn is_empty(&self) -> bool {
        self.calories.is_none()
            && self.vitamins.is_none()
            && self.fiber.is_none()
            && self.minerals.is_none()
            && self.benefits.is_none()
    }
}

/// One produce item's assessment.
///
/// `position` is only `None` between normalization and batch assembly;
/// every item inside a [`BatchResult`] carries one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemAnalysis {
    pub label: String,
    pub freshness_score: u8,
    pub recommendation: Recommendation,
    pub confidence: u8,
    pub details: String,
    pub characteristics: Characteristics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition_info: Option<NutritionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_tips: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_uses: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ripe_timing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medicinal_uses: Option<String>,
}

pub const DEFAULT_LABEL: &str = "Unknown Produce";
pub const DEFAULT_DETAILS: &str = "Analysis completed";

impl ItemAnalysis {
    /// Bare record with every optional field unset.
    pub fn new(label: impl Into<String>, freshness_score: u8, recommendation: Recommendation) -> Self {
        Self {
            label: label.into(),
            freshness_score: freshness_score.min(100),
            recommendation,
            confidence: 75,
            details: DEFAULT_DETAILS.to_string(),
            characteristics: Characteristics::default(),
            position: None,
            storage_recommendation: None,
            days_remaining: None,
            nutrition_info: None,
            selection_tips: None,
            season_info: None,
            common_uses: None,
            ripe_timing: None,
            pairings: None,
            medicinal_uses: None,
        }
    }

    /// Fixed record returned when nothing useful can be derived.
    pub fn neutral() -> Self {
        let mut item = Self::new("Produce Item", 50, Recommendation::Check);
        item.confidence = 40;
        item.details = "Unable to perform detailed analysis. Inspect the item for color, \
                        texture and any signs of spoilage."
            .to_string();
        item.characteristics = Characteristics {
            color: "Unable to determine".to_string(),
            texture: "Unable to determine".to_string(),
            blemishes: "Check manually".to_string(),
            ripeness: "Inspect visually".to_string(),
        };
        item
    }
}

/// Which path produced a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Primary,
    Heuristic,
}

/// Indices into [`BatchResult::items`], grouped by recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Categorization {
    pub buy: Vec<usize>,
    pub check: Vec<usize>,
    pub avoid: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageAdvice {
    pub label: String,
    pub advice: String,
}

/// Aggregate analysis envelope for one captured image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub analysis_id: String,
    pub created_at: DateTime<Utc>,
    pub source: AnalysisSource,
    pub items: Vec<ItemAnalysis>,
    pub item_count: usize,
    pub average_freshness: u8,
    #[serde(default)]
    pub best: Option<usize>,
    #[serde(default)]
    pub worst: Option<usize>,
    pub categorization: Categorization,
    pub ranking: Vec<usize>,
    pub storage_advice: Vec<StorageAdvice>,
    pub shopping_recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl BatchResult {
    pub fn best_item(&self) -> Option<&ItemAnalysis> {
        self.best.and_then(|i| self.items.get(i))
    }

    pub fn worst_item(&self) -> Option<&ItemAnalysis> {
        self.worst.and_then(|i| self.items.get(i))
    }

    /// Items in ranking order, freshest first.
    pub fn ranked_items(&self) -> impl Iterator<Item = &ItemAnalysis> {
        self.ranking.iter().filter_map(|&i| self.items.get(i))
    }
}
