//! Emission prediction for a single profile.
//!
//! A prediction combines three independent pieces:
//!
//! - the forest's estimate of next month's total emission
//! - a per-category breakdown from fixed emission factors
//! - the forest's feature importances, reported under readable names
//!
//! The breakdown never depends on the model, so it is exact for given inputs.

use crate::error::{CarbonError, Result};
use crate::model::ModelManager;
use crate::profile::parse_number;
use crate::primitives::round_to;
use crate::recommend::{breakdown_recommendations, BreakdownCategory};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::sync::Arc;

/// Number of model inputs.
pub const N_INPUTS: usize = 6;

/// Request field names, in model input order.
pub const INPUT_FIELDS: [&str; N_INPUTS] = [
    "avg_daily_travel_km",
    "avg_electricity_kwh",
    "avg_lpg_kg",
    "avg_nonveg_meals",
    "avg_items_purchased",
    "last_month_emission",
];

/// Readable names reported with feature importances, in model input order.
pub const IMPORTANCE_NAMES: [&str; N_INPUTS] = [
    "Travel",
    "Electricity",
    "LPG",
    "Non-Veg Meals",
    "Shopping",
    "Last Month",
];

/// Fixed emission factors (kg CO2 per unit).
pub mod factors {
    /// Days of travel per month.
    pub const TRAVEL_DAYS_PER_MONTH: f64 = 30.0;
    /// Per km, average car.
    pub const TRANSPORT_PER_KM: f64 = 0.12;
    /// Per kWh.
    pub const ELECTRICITY_PER_KWH: f64 = 0.92;
    /// Per kg of LPG.
    pub const LPG_PER_KG: f64 = 3.0;
    /// Weeks per month, applied to weekly meal and item counts.
    pub const WEEKS_PER_MONTH: f64 = 4.0;
    /// Per non-vegetarian meal.
    pub const NONVEG_PER_MEAL: f64 = 2.5;
    /// Per purchased item.
    pub const SHOPPING_PER_ITEM: f64 = 5.0;
}

/// Raw prediction request. Every field is required; absence is reported by
/// [`validate`](Self::validate) rather than at parse time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    pub avg_daily_travel_km: Option<f64>,
    pub avg_electricity_kwh: Option<f64>,
    pub avg_lpg_kg: Option<f64>,
    pub avg_nonveg_meals: Option<f64>,
    pub avg_items_purchased: Option<f64>,
    pub last_month_emission: Option<f64>,
}

impl PredictionInput {
    /// Reads the six fields from a JSON object. Numbers and numeric strings
    /// are accepted; `null` counts as absent.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::InvalidField`] if the payload is not an object
    /// or a field holds something that is not a finite number.
    pub fn from_json(payload: &Value) -> Result<Self> {
        let object = payload.as_object().ok_or_else(|| CarbonError::InvalidField {
            field: "payload".to_string(),
            reason: "expected a JSON object".to_string(),
        })?;

        let mut values = [None; N_INPUTS];
        for (slot, field) in values.iter_mut().zip(INPUT_FIELDS) {
            *slot = match object.get(field) {
                None | Some(Value::Null) => None,
                Some(value) => Some(parse_number(field, value)?),
            };
        }
        Ok(Self::from_options(values))
    }

    fn from_options(values: [Option<f64>; N_INPUTS]) -> Self {
        let [avg_daily_travel_km, avg_electricity_kwh, avg_lpg_kg, avg_nonveg_meals, avg_items_purchased, last_month_emission] =
            values;
        Self {
            avg_daily_travel_km,
            avg_electricity_kwh,
            avg_lpg_kg,
            avg_nonveg_meals,
            avg_items_purchased,
            last_month_emission,
        }
    }

    fn as_options(&self) -> [Option<f64>; N_INPUTS] {
        [
            self.avg_daily_travel_km,
            self.avg_electricity_kwh,
            self.avg_lpg_kg,
            self.avg_nonveg_meals,
            self.avg_items_purchased,
            self.last_month_emission,
        ]
    }

    /// Checks that all six fields are present and finite.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::MissingFields`] listing every absent field in
    /// input order, or [`CarbonError::InvalidField`] for a non-finite value.
    pub fn validate(&self) -> Result<ProfileInputs> {
        let options = self.as_options();

        let missing: Vec<String> = INPUT_FIELDS
            .iter()
            .zip(options)
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| (*name).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(CarbonError::MissingFields(missing));
        }

        let mut values = [0.0; N_INPUTS];
        for ((slot, value), field) in values.iter_mut().zip(options).zip(INPUT_FIELDS) {
            let value = value.unwrap_or_default();
            if !value.is_finite() {
                return Err(CarbonError::InvalidField {
                    field: field.to_string(),
                    reason: "must be a finite number".to_string(),
                });
            }
            *slot = value;
        }
        Ok(ProfileInputs::from_array(values))
    }
}

/// Validated model inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileInputs {
    pub travel_km: f64,
    pub electricity_kwh: f64,
    pub lpg_kg: f64,
    pub nonveg_meals: f64,
    pub items_purchased: f64,
    pub last_month_emission: f64,
}

impl ProfileInputs {
    /// Values in model input order.
    #[must_use]
    pub fn to_array(&self) -> [f64; N_INPUTS] {
        [
            self.travel_km,
            self.electricity_kwh,
            self.lpg_kg,
            self.nonveg_meals,
            self.items_purchased,
            self.last_month_emission,
        ]
    }

    /// Builds inputs from values in model input order.
    #[must_use]
    pub fn from_array(values: [f64; N_INPUTS]) -> Self {
        let [travel_km, electricity_kwh, lpg_kg, nonveg_meals, items_purchased, last_month_emission] =
            values;
        Self {
            travel_km,
            electricity_kwh,
            lpg_kg,
            nonveg_meals,
            items_purchased,
            last_month_emission,
        }
    }
}

/// Monthly emission per category from fixed factors, in kg CO2.
///
/// # Examples
///
/// ```
/// use carbonsense::predict::{EmissionBreakdown, ProfileInputs};
///
/// let inputs = ProfileInputs::from_array([15.5, 120.0, 18.0, 12.0, 6.0, 200.0]);
/// let breakdown = EmissionBreakdown::from_inputs(&inputs).rounded();
/// assert_eq!(breakdown.transport, 55.8);
/// assert_eq!(breakdown.electricity, 110.4);
/// assert_eq!(breakdown.lpg, 54.0);
/// assert_eq!(breakdown.food, 120.0);
/// assert_eq!(breakdown.shopping, 120.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmissionBreakdown {
    pub transport: f64,
    pub electricity: f64,
    pub lpg: f64,
    pub food: f64,
    pub shopping: f64,
}

impl EmissionBreakdown {
    /// Applies the fixed emission factors.
    #[must_use]
    pub fn from_inputs(inputs: &ProfileInputs) -> Self {
        use factors::*;
        Self {
            transport: inputs.travel_km * TRAVEL_DAYS_PER_MONTH * TRANSPORT_PER_KM,
            electricity: inputs.electricity_kwh * ELECTRICITY_PER_KWH,
            lpg: inputs.lpg_kg * LPG_PER_KG,
            food: inputs.nonveg_meals * WEEKS_PER_MONTH * NONVEG_PER_MEAL,
            shopping: inputs.items_purchased * WEEKS_PER_MONTH * SHOPPING_PER_ITEM,
        }
    }

    /// `(category, kg)` pairs in canonical category order.
    #[must_use]
    pub fn entries(&self) -> [(BreakdownCategory, f64); 5] {
        [
            (BreakdownCategory::Transport, self.transport),
            (BreakdownCategory::Electricity, self.electricity),
            (BreakdownCategory::Lpg, self.lpg),
            (BreakdownCategory::Food, self.food),
            (BreakdownCategory::Shopping, self.shopping),
        ]
    }

    /// Sum over all categories.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.entries().iter().map(|(_, kg)| kg).sum()
    }

    /// Every category rounded to 2 decimals.
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self {
            transport: round_to(self.transport, 2),
            electricity: round_to(self.electricity, 2),
            lpg: round_to(self.lpg, 2),
            food: round_to(self.food, 2),
            shopping: round_to(self.shopping, 2),
        }
    }
}

/// Feature importances keyed by readable name, serialized in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureImportance(Vec<(&'static str, f64)>);

impl FeatureImportance {
    /// Pairs each weight with its name from [`IMPORTANCE_NAMES`].
    #[must_use]
    pub fn from_weights(weights: &[f32]) -> Self {
        Self(
            IMPORTANCE_NAMES
                .into_iter()
                .zip(weights)
                .map(|(name, &w)| (name, f64::from(w)))
                .collect(),
        )
    }

    /// `(name, weight)` pairs in input order.
    #[must_use]
    pub fn entries(&self) -> &[(&'static str, f64)] {
        &self.0
    }

    /// Weight for `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.iter().find(|(n, _)| *n == name).map(|(_, w)| *w)
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.0.iter().map(|(_, w)| w).sum()
    }

    fn rounded(&self) -> Self {
        Self(self.0.iter().map(|&(n, w)| (n, round_to(w, 4))).collect())
    }
}

impl Serialize for FeatureImportance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, weight) in &self.0 {
            map.serialize_entry(name, weight)?;
        }
        map.end()
    }
}

/// Full prediction response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Model estimate, 2 decimals
    #[serde(rename = "predicted_emission_kgCO2")]
    pub predicted_emission_kg_co2: f64,
    /// Fixed-factor breakdown, 2 decimals
    pub breakdown: EmissionBreakdown,
    /// Forest importances, 4 decimals
    pub feature_importance: FeatureImportance,
    /// At most three tips, or one positive message
    pub recommendations: Vec<String>,
    /// Prediction minus last month's emission, 2 decimals
    pub comparison_to_last_month: f64,
}

/// Runs predictions against the shared model.
#[derive(Debug, Clone)]
pub struct EmissionPredictor {
    manager: Arc<ModelManager>,
}

impl EmissionPredictor {
    /// Creates a predictor backed by `manager`.
    #[must_use]
    pub fn new(manager: Arc<ModelManager>) -> Self {
        Self { manager }
    }

    /// The model manager this predictor uses.
    #[must_use]
    pub fn manager(&self) -> &Arc<ModelManager> {
        &self.manager
    }

    /// Validates `input` and predicts.
    ///
    /// # Errors
    ///
    /// Returns a validation error for missing or invalid fields, or
    /// [`CarbonError::ModelUnavailable`] if no model can be loaded or trained.
    pub fn predict(&self, input: &PredictionInput) -> Result<PredictionResult> {
        let inputs = input.validate()?;
        self.predict_inputs(&inputs)
    }

    /// Predicts for already-validated inputs.
    ///
    /// # Errors
    ///
    /// See [`predict`](Self::predict).
    pub fn predict_inputs(&self, inputs: &ProfileInputs) -> Result<PredictionResult> {
        let model = self.manager.get()?;
        let raw_prediction = model.predict_one(&inputs.to_array())?;
        let predicted = round_to(raw_prediction, 2);

        let breakdown = EmissionBreakdown::from_inputs(inputs);
        let recommendations = breakdown_recommendations(&breakdown.entries())
            .into_iter()
            .map(str::to_string)
            .collect();

        Ok(PredictionResult {
            predicted_emission_kg_co2: predicted,
            breakdown: breakdown.rounded(),
            feature_importance: FeatureImportance::from_weights(&model.feature_importances())
                .rounded(),
            recommendations,
            comparison_to_last_month: round_to(predicted - inputs.last_month_emission, 2),
        })
    }
}
