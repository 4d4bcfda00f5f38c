//! Single-activity daily emission calculator.
//!
//! A stateless lookup: each activity category maps to one linear formula
//! over its details. Unknown categories and unknown modes contribute 0.
//!
//! # Example
//!
//! ```
//! use carbonsense::calculator::{compute_daily_emission, DailyActivity};
//! use serde_json::json;
//!
//! let activity: DailyActivity = serde_json::from_value(json!({
//!     "category": "Transport",
//!     "details": {"distance_travelled_km": 20, "transport_mode": "Car"}
//! })).expect("valid payload");
//!
//! let result = compute_daily_emission(&activity).expect("valid details");
//! assert_eq!(result.total_emission_kg_co2, 4.2);
//! ```

use crate::error::{CarbonError, Result};
use crate::primitives::round_to;
use crate::profile::parse_number;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// kg CO2 per km by transport mode.
pub const TRANSPORT_FACTORS: &[(&str, f64)] = &[
    ("Car", 0.21),
    ("Bike", 0.09),
    ("Public Transport", 0.05),
    ("Walking", 0.0),
    ("Carpool", 0.07),
    ("Electric Car", 0.05),
];

/// kg CO2 per kWh by electricity source.
pub const GRID_FACTORS: &[(&str, f64)] = &[("State Grid", 0.82), ("Hybrid", 0.45), ("Solar", 0.10)];

/// kg CO2 per day by cooking fuel.
pub const COOKING_FACTORS: &[(&str, f64)] = &[("LPG", 1.5), ("PNG", 1.2), ("Induction", 0.3)];

/// kg CO2 per kg of waste.
pub const WASTE_PER_KG: f64 = 1.8;
/// kg CO2 per currency unit spent.
pub const SHOPPING_PER_UNIT_SPENT: f64 = 1.0 / 500.0;
/// kg CO2 per liter of water.
pub const WATER_PER_LITER: f64 = 0.0005;
/// Fixed part of an electricity bill.
pub const BILL_FIXED_COST: f64 = 150.0;
/// Price of one kWh.
pub const COST_PER_KWH: f64 = 8.0;

const DEFAULT_TRANSPORT_MODE: &str = "Car";
const DEFAULT_GRID: &str = "State Grid";
const DEFAULT_GRID_FACTOR: f64 = 0.82;
const DEFAULT_COOKING_FUEL: &str = "LPG";
const DEFAULT_DAYS_IN_MONTH: f64 = 30.0;

/// One logged activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyActivity {
    /// `Transport`, `Electricity`, `Cooking`, `Waste`, `Shopping` or `Water`
    #[serde(default)]
    pub category: Option<String>,
    /// Category-specific inputs
    #[serde(default)]
    pub details: Map<String, Value>,
}

/// Calculator output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEmission {
    pub category: Option<String>,
    /// Rounded to 3 decimals
    #[serde(rename = "total_emission_kgCO2")]
    pub total_emission_kg_co2: f64,
}

/// Computes the emission of one activity.
///
/// # Errors
///
/// Returns [`CarbonError::InvalidField`] if a numeric detail is not a number
/// or `days_in_month` is not positive.
pub fn compute_daily_emission(activity: &DailyActivity) -> Result<DailyEmission> {
    let d = &activity.details;

    let total = match activity.category.as_deref() {
        Some("Transport") => {
            let distance = number(d, "distance_travelled_km", 0.0)?;
            let mode = text(d, "transport_mode", DEFAULT_TRANSPORT_MODE);
            distance * lookup(TRANSPORT_FACTORS, mode).unwrap_or(0.0)
        }
        Some("Electricity") => {
            let bill = number(d, "electricity_bill", 0.0)?;
            let days = number(d, "days_in_month", DEFAULT_DAYS_IN_MONTH)?.trunc();
            if days <= 0.0 {
                return Err(CarbonError::InvalidField {
                    field: "days_in_month".to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            let kwh_per_day = (bill - BILL_FIXED_COST).max(0.0) / COST_PER_KWH / days;
            let source = text(d, "electricity_source", DEFAULT_GRID);
            kwh_per_day * lookup(GRID_FACTORS, source).unwrap_or(DEFAULT_GRID_FACTOR)
        }
        Some("Cooking") => {
            let fuel = text(d, "cooking_fuel_type", DEFAULT_COOKING_FUEL);
            lookup(COOKING_FACTORS, fuel).unwrap_or(0.0)
        }
        Some("Waste") => number(d, "daily_waste_generated_kg", 0.0)? * WASTE_PER_KG,
        Some("Shopping") => number(d, "purchase_amount", 0.0)? * SHOPPING_PER_UNIT_SPENT,
        Some("Water") => number(d, "liters", 0.0)? * WATER_PER_LITER,
        _ => 0.0,
    };

    Ok(DailyEmission {
        category: activity.category.clone(),
        total_emission_kg_co2: round_to(total, 3),
    })
}

fn lookup(table: &[(&str, f64)], key: &str) -> Option<f64> {
    table.iter().find(|(name, _)| *name == key).map(|(_, f)| *f)
}

fn text<'a>(details: &'a Map<String, Value>, key: &str, default: &'a str) -> &'a str {
    details.get(key).and_then(Value::as_str).unwrap_or(default)
}

fn number(details: &Map<String, Value>, key: &str, default: f64) -> Result<f64> {
    let value = match details.get(key) {
        None | Some(Value::Null) => return Ok(default),
        Some(value) => value,
    };
    parse_number(key, value)
}
