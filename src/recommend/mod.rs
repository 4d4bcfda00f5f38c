//! Recommendation catalog.
//!
//! Two fixed sources of advice:
//!
//! - **Lifestyle**: three ordered tips per [`LifestyleSegment`] label, with a
//!   single fallback entry for labels outside the catalog
//! - **Breakdown**: one tip per emission category that ranks in the top three
//!   and exceeds its trigger threshold
//!
//! # Quick Start
//!
//! ```
//! use carbonsense::recommend::{breakdown_recommendations, lifestyle_recommendations, BreakdownCategory};
//!
//! let tips = lifestyle_recommendations("Moderate Lifestyle");
//! assert_eq!(tips.len(), 3);
//! assert_eq!(lifestyle_recommendations("Unknown"), vec!["Recommendation unavailable."]);
//!
//! let advice = breakdown_recommendations(&[
//!     (BreakdownCategory::Transport, 80.0),
//!     (BreakdownCategory::Electricity, 20.0),
//! ]);
//! assert_eq!(advice.len(), 1);
//! ```

use crate::rules::{first_match, Rule};
use crate::segment::LifestyleSegment;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Returned for a label the catalog does not know.
pub const UNKNOWN_LABEL_FALLBACK: &str = "Recommendation unavailable.";

/// Returned when no breakdown category triggers advice.
pub const WELL_MANAGED: &str = "✅ Great job! Your carbon footprint is well managed. Keep it up!";

/// Number of highest-emitting categories considered for advice.
pub const TOP_CATEGORIES: usize = 3;

/// Ordered tips for a lifestyle segment.
#[must_use]
pub fn segment_recommendations(segment: LifestyleSegment) -> [&'static str; 3] {
    match segment {
        LifestyleSegment::LowImpact => [
            "Great job! You're already eco-conscious.",
            "Try composting and growing your own herbs.",
            "Consider using 100% renewable energy sources.",
        ],
        LifestyleSegment::Moderate => [
            "Reduce non-veg consumption gradually.",
            "Switch to LED bulbs and energy-efficient appliances.",
            "Use public transportation or carpool when possible.",
        ],
        LifestyleSegment::HighImpact => [
            "Reduce high electricity usage and unplug idle devices.",
            "Limit car usage — consider EVs, cycling, or public transport.",
            "Reduce non-veg meals and improve waste management habits.",
        ],
    }
}

/// Tips for a lifestyle label. Never empty.
#[must_use]
pub fn lifestyle_recommendations(label: &str) -> Vec<&'static str> {
    match LifestyleSegment::from_label(label) {
        Some(segment) => segment_recommendations(segment).to_vec(),
        None => vec![UNKNOWN_LABEL_FALLBACK],
    }
}

/// Category of the fixed-factor emission breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownCategory {
    /// Travel
    Transport,
    /// Grid electricity
    Electricity,
    /// Cooking gas
    Lpg,
    /// Non-vegetarian meals
    Food,
    /// Purchased goods
    Shopping,
}

impl BreakdownCategory {
    /// Categories in canonical order.
    pub const ALL: [BreakdownCategory; 5] = [
        Self::Transport,
        Self::Electricity,
        Self::Lpg,
        Self::Food,
        Self::Shopping,
    ];

    /// Key used in serialized breakdowns.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Electricity => "electricity",
            Self::Lpg => "lpg",
            Self::Food => "food",
            Self::Shopping => "shopping",
        }
    }
}

impl fmt::Display for BreakdownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Advice triggers: a category's emission must strictly exceed its threshold.
pub const BREAKDOWN_RULES: &[Rule<(BreakdownCategory, f64), &str>] = &[
    Rule::new(
        "transport-over-40",
        |&(c, kg)| c == BreakdownCategory::Transport && kg > 40.0,
        "🚗 Consider carpooling, public transport, or cycling to reduce travel emissions",
    ),
    Rule::new(
        "electricity-over-100",
        |&(c, kg)| c == BreakdownCategory::Electricity && kg > 100.0,
        "💡 Switch to LED bulbs and unplug devices when not in use",
    ),
    Rule::new(
        "lpg-over-50",
        |&(c, kg)| c == BreakdownCategory::Lpg && kg > 50.0,
        "🔥 Use pressure cookers and optimize cooking to reduce LPG usage",
    ),
    Rule::new(
        "food-over-40",
        |&(c, kg)| c == BreakdownCategory::Food && kg > 40.0,
        "🥗 Try 1-2 plant-based meals per week to reduce food carbon footprint",
    ),
    Rule::new(
        "shopping-over-30",
        |&(c, kg)| c == BreakdownCategory::Shopping && kg > 30.0,
        "🛍️ Buy less, choose sustainable products, and repair instead of replace",
    ),
];

/// Advice for an emission breakdown.
///
/// Categories are ranked by emission, highest first, with ties kept in the
/// given order. Each of the top three contributes its tip when it crosses
/// its threshold. If none do, the result is the single [`WELL_MANAGED`]
/// message.
#[must_use]
pub fn breakdown_recommendations(entries: &[(BreakdownCategory, f64)]) -> Vec<&'static str> {
    let mut ranked = entries.to_vec();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let tips: Vec<&'static str> = ranked
        .iter()
        .take(TOP_CATEGORIES)
        .filter_map(|entry| first_match(BREAKDOWN_RULES, entry).copied())
        .collect();

    if tips.is_empty() {
        vec![WELL_MANAGED]
    } else {
        tips
    }
}
