//! Local freshness estimate from pixel statistics.
//!
//! Used whenever the remote model is unavailable or unusable. The estimate
//! is a pure function of the pixels: the same image always yields the same
//! record, and it never fails.

use image::RgbImage;

use crate::types::{Characteristics, ItemAnalysis, Recommendation};

/// Upper bound on sampled rows and columns.
const SAMPLE_GRID: u32 = 100;

const BASE_SCORE: f64 = 80.0;

const BRIGHT_THRESHOLD: f64 = 0.6;
const BRIGHT_BONUS: f64 = 10.0;
const DARK_THRESHOLD: f64 = 0.3;
const DARK_PENALTY: f64 = 20.0;

const VIVID_THRESHOLD: f64 = 0.3;
const VIVID_BONUS: f64 = 5.0;
const FLAT_THRESHOLD: f64 = 0.1;
const FLAT_PENALTY: f64 = 10.0;

// Full discoloration alone is enough to push any image into Avoid.
const DISCOLORATION_WEIGHT: f64 = 100.0;

const HEURISTIC_CONFIDENCE: u8 = 75;

/// Channel statistics over the sampled grid, all normalized to 0..=1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStats {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub brightness: f64,
    /// Mean pairwise channel distance; high for vivid produce, low for grey.
    pub variation: f64,
    /// Fraction of samples in the dark brown band.
    pub discoloration: f64,
    pub samples: usize,
}

fn sample_coords(len: u32) -> impl Iterator<Item = u32> {
    let steps = len.min(SAMPLE_GRID);
    (0..steps).map(move |i| ((i as u64 * len as u64) / steps as u64) as u32)
}

fn is_discolored(r: f64, g: f64, b: f64) -> bool {
    r < 0.4 && g < 0.3 && b < 0.2 && r >= g && r > b
}

impl ColorStats {
    /// `None` for an image without pixels.
    pub fn sample(pixels: &RgbImage) -> Option<Self> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return None;
        }

        let mut red = 0.0;
        let mut green = 0.0;
        let mut blue = 0.0;
        let mut variation = 0.0;
        let mut discolored = 0usize;
        let mut samples = 0usize;

        for y in sample_coords(height) {
            for x in sample_coords(width) {
                let [r, g, b] = pixels.get_pixel(x, y).0;
                let (r, g, b) = (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);

                red += r;
                green += g;
                blue += b;
                variation += (r - g).abs() + (g - b).abs() + (r - b).abs();
                if is_discolored(r, g, b) {
                    discolored += 1;
                }
                samples += 1;
            }
        }

        let n = samples as f64;
        let (red, green, blue) = (red / n, green / n, blue / n);
        Some(Self {
            red,
            green,
            blue,
            brightness: (red + green + blue) / 3.0,
            variation: variation / n,
            discoloration: discolored as f64 / n,
            samples,
        })
    }
}

pub fn score(stats: &ColorStats) -> u8 {
    let mut score = BASE_SCORE;

    if stats.brightness > BRIGHT_THRESHOLD {
        score += BRIGHT_BONUS;
    } else if stats.brightness < DARK_THRESHOLD {
        score -= DARK_PENALTY;
    }

    if stats.variation > VIVID_THRESHOLD {
        score += VIVID_BONUS;
    } else if stats.variation < FLAT_THRESHOLD {
        score -= FLAT_PENALTY;
    }

    score -= stats.discoloration * DISCOLORATION_WEIGHT;

    score.round().clamp(0.0, 100.0) as u8
}

/// Coarse colour-based guess at what the item is.
pub fn identify(stats: &ColorStats) -> &'static str {
    let (r, g, b) = (stats.red, stats.green, stats.blue);

    if r > 0.7 && g < 0.3 && b < 0.3 {
        "Strawberry"
    } else if r > 0.6 && g < 0.4 && b < 0.4 {
        "Apple"
    } else if r > 0.8 && g > 0.7 && b < 0.3 {
        "Banana"
    } else if r > 0.7 && g > 0.5 && b < 0.3 {
        "Orange"
    } else if r > 0.6 && g > 0.2 && b > 0.5 {
        "Grape"
    } else if r > 0.6 && g > 0.2 && b < 0.3 {
        "Tomato"
    } else if g > 0.5 && r < 0.4 && b < 0.4 {
        "Lime"
    } else {
        "Produce Item"
    }
}

fn characteristics_for(score: u8) -> Characteristics {
    let (color, texture, blemishes, ripeness) = if score >= 80 {
        ("Good natural coloring", "Firm appearance", "Minimal imperfections", "Good eating condition")
    } else if score >= 60 {
        ("Acceptable coloring", "Moderate firmness", "Some surface marks", "Fair condition")
    } else {
        ("Dull appearance", "Soft texture", "Visible imperfections", "Poor condition")
    };

    Characteristics {
        color: color.to_string(),
        texture: texture.to_string(),
        blemishes: blemishes.to_string(),
        ripeness: ripeness.to_string(),
    }
}

pub fn estimate(pixels: &RgbImage) -> ItemAnalysis {
    let Some(stats) = ColorStats::sample(pixels) else {
        return ItemAnalysis::neutral();
    };

    let score = score(&stats);
    let recommendation = Recommendation::from_score(score);
    let label = identify(&stats);
    let characteristics = characteristics_for(score);

    let quality = match recommendation {
        Recommendation::Buy => "good",
        Recommendation::Check => "fair",
        Recommendation::Avoid => "poor",
    };
    let details = format!(
        "{label} analyzed from image color statistics. {} appearance suggests {quality} quality.",
        characteristics.color
    );

    let mut item = ItemAnalysis::new(label, score, recommendation);
    item.confidence = HEURISTIC_CONFIDENCE;
    item.details = details;
    item.characteristics = characteristics;
    item
}
