//! Batch assembly: position synthesis, aggregates and the final envelope.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::types::{
    AnalysisSource, BatchResult, Categorization, ItemAnalysis, Position, Recommendation,
    StorageAdvice,
};

// Grid used for items the source did not place.
const GRID_COLUMNS: usize = 4;
const GRID_ORIGIN_X: f64 = 15.0;
const GRID_ORIGIN_Y: f64 = 15.0;
const GRID_STEP_X: f64 = 20.0;
const GRID_STEP_Y: f64 = 25.0;
const CELL_WIDTH: f64 = 12.0;
const CELL_HEIGHT: f64 = 15.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantError {
    #[error("itemCount {declared} does not match {actual} items")]
    ItemCount { declared: usize, actual: usize },

    #[error("item {0} has a score or confidence above 100")]
    OutOfRange(usize),

    #[error("item {0} has no position")]
    MissingPosition(usize),

    #[error("averageFreshness {declared} should be {expected}")]
    Average { declared: u8, expected: u8 },

    #[error("best/worst do not match item scores")]
    Extremes,

    #[error("categorization is not a partition of items by recommendation")]
    Categorization,

    #[error("ranking is not a freshness ordering of items")]
    Ranking,
}

/// Grid slot for the item at `index`; distinct indices never share a slot.
pub fn synthesize_position(index: usize) -> Position {
    let column = index % GRID_COLUMNS;
    let row = index / GRID_COLUMNS;
    Position {
        x: GRID_ORIGIN_X + column as f64 * GRID_STEP_X,
        y: GRID_ORIGIN_Y + row as f64 * GRID_STEP_Y,
        width: CELL_WIDTH,
        height: CELL_HEIGHT,
    }
}

fn average_freshness(items: &[ItemAnalysis]) -> u8 {
    if items.is_empty() {
        return 0;
    }
    let n = items.len() as u64;
    let sum: u64 = items.iter().map(|i| i.freshness_score as u64).sum();
    // round half up
    ((2 * sum + n) / (2 * n)) as u8
}

/// Strict comparisons keep the first-seen item on ties.
fn extremes(items: &[ItemAnalysis]) -> (Option<usize>, Option<usize>) {
    let mut best: Option<usize> = None;
    let mut worst: Option<usize> = None;

    for (i, item) in items.iter().enumerate() {
        match best {
            Some(b) if items[b].freshness_score >= item.freshness_score => {}
            _ => best = Some(i),
        }
        match worst {
            Some(w) if items[w].freshness_score <= item.freshness_score => {}
            _ => worst = Some(i),
        }
    }
    (best, worst)
}

fn categorize(items: &[ItemAnalysis]) -> Categorization {
    let mut out = Categorization::default();
    for (i, item) in items.iter().enumerate() {
        match item.recommendation {
            Recommendation::Buy => out.buy.push(i),
            Recommendation::Check => out.check.push(i),
            Recommendation::Avoid => out.avoid.push(i),
        }
    }
    out
}

fn rank(items: &[ItemAnalysis]) -> Vec<usize> {
    let mut ranking: Vec<usize> = (0..items.len()).collect();
    ranking.sort_by(|&a, &b| items[b].freshness_score.cmp(&items[a].freshness_score));
    ranking
}

fn storage_advice(item: &ItemAnalysis) -> StorageAdvice {
    let advice = match &item.storage_recommendation {
        Some(own) => own.clone(),
        None => match Recommendation::from_score(item.freshness_score) {
            Recommendation::Buy => "Store in a cool, dry place or refrigerate to extend freshness",
            Recommendation::Check => "Refrigerate and use within a few days",
            Recommendation::Avoid => "Use immediately or discard if spoiled",
        }
        .to_string(),
    };
    StorageAdvice { label: item.label.clone(), advice }
}

fn shopping_summary(count: usize, average: u8) -> String {
    if count == 0 {
        return "No produce detected in this image.".to_string();
    }
    format!(
        "Found {count} items with {average}% average freshness. \
         Prioritize items with higher freshness scores."
    )
}

/// Builds the envelope for one analysis. Items without a position get one
/// from [`synthesize_position`] using their index in the batch.
pub fn assemble(
    items: Vec<ItemAnalysis>,
    source: AnalysisSource,
    created_at: DateTime<Utc>,
) -> BatchResult {
    let items: Vec<ItemAnalysis> = items
        .into_iter()
        .enumerate()
        .map(|(i, mut item)| {
            if item.position.is_none() {
                item.position = Some(synthesize_position(i));
            }
            item
        })
        .collect();

    let average = average_freshness(&items);
    let (best, worst) = extremes(&items);

    BatchResult {
        analysis_id: format!("batch-{}", Uuid::new_v4()),
        created_at,
        source,
        item_count: items.len(),
        average_freshness: average,
        best,
        worst,
        categorization: categorize(&items),
        ranking: rank(&items),
        storage_advice: items.iter().map(storage_advice).collect(),
        shopping_recommendation: shopping_summary(items.len(), average),
        language: None,
        items,
    }
}

/// Checks the structural invariants of an envelope, e.g. one received from a
/// client for sharing.
pub fn verify(batch: &BatchResult) -> Result<(), InvariantError> {
    let items = &batch.items;

    if batch.item_count != items.len() {
        return Err(InvariantError::ItemCount {
            declared: batch.item_count,
            actual: items.len(),
        });
    }

    for (i, item) in items.iter().enumerate() {
        if item.freshness_score > 100 || item.confidence > 100 {
            return Err(InvariantError::OutOfRange(i));
        }
        if item.position.is_none() {
            return Err(InvariantError::MissingPosition(i));
        }
    }

    let expected = average_freshness(items);
    if batch.average_freshness != expected {
        return Err(InvariantError::Average {
            declared: batch.average_freshness,
            expected,
        });
    }

    if (batch.best, batch.worst) != extremes(items) {
        return Err(InvariantError::Extremes);
    }

    if batch.categorization != categorize(items) {
        return Err(InvariantError::Categorization);
    }

    let mut seen = vec![false; items.len()];
    for &i in &batch.ranking {
        match seen.get_mut(i) {
            Some(slot) if !*slot => *slot = true,
            _ => return Err(InvariantError::Ranking),
        }
    }
    let ordered = batch
        .ranking
        .windows(2)
        .all(|w| items[w[0]].freshness_score >= items[w[1]].freshness_score);
    if !ordered || seen.iter().any(|s| !s) {
        return Err(InvariantError::Ranking);
    }

    Ok(())
}
