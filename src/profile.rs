//! User profile records.
//!
//! Profiles arrive as loosely-typed JSON objects. Every known numeric metric
//! is optional; absence is never an error. Unknown keys are kept so they can
//! be echoed back unchanged in clustering results.

use crate::error::{CarbonError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One household's self-reported lifestyle metrics.
///
/// # Examples
///
/// ```
/// use carbonsense::profile::UserProfile;
///
/// let profile: UserProfile = serde_json::from_str(
///     r#"{"_id": "u-1", "avg_daily_travel_km": 12.5, "city": "Pune"}"#,
/// ).expect("valid profile");
///
/// assert_eq!(profile.avg_daily_travel_km, Some(12.5));
/// assert!(profile.avg_lpg_kg.is_none());
/// assert!(profile.matches_id("u-1"));
/// assert_eq!(profile.extra["city"], "Pune");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Storage identifier
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Application-level user identifier
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Value>,

    /// Average distance travelled per day (km)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_daily_travel_km: Option<f64>,
    /// Average electricity consumption (kWh)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_electricity_kwh: Option<f64>,
    /// Average cooking gas consumption (kg)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_lpg_kg: Option<f64>,
    /// Average number of non-vegetarian meals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_nonveg_meals: Option<f64>,
    /// Average number of items purchased per month
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_items_purchased: Option<f64>,
    /// Share of consumption covered by renewable sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_renewable_usage: Option<f64>,

    /// Precomputed transport emission (kg CO2)
    #[serde(
        rename = "avg_transport_emission_kgCO2",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub avg_transport_emission_kg_co2: Option<f64>,
    /// Precomputed waste generation (kg)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_waste_generated_kg: Option<f64>,
    /// Precomputed purchases per day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_purchases_per_day: Option<f64>,

    /// Any other keys supplied by the caller
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Parses a profile from a JSON value, naming its batch position on failure.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::InvalidField`] if the value is not an object or a
    /// known metric holds a non-numeric value.
    pub fn from_value(index: usize, value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| CarbonError::InvalidField {
            field: format!("profiles[{index}]"),
            reason: e.to_string(),
        })
    }

    /// Identifiers carried by this profile, `_id` first.
    #[must_use]
    pub fn ids(&self) -> Vec<ProfileId> {
        [&self.id, &self.user_id]
            .into_iter()
            .flatten()
            .filter_map(ProfileId::from_value)
            .collect()
    }

    /// Returns true if either identifier renders to `wanted`.
    #[must_use]
    pub fn matches_id(&self, wanted: &str) -> bool {
        self.ids().iter().any(|id| id.as_str() == wanted)
    }
}

/// A profile identifier rendered to its string form.
///
/// Identifiers may arrive as JSON strings or numbers; both compare by their
/// textual rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProfileId(String);

impl ProfileId {
    /// Renders a JSON scalar to an identifier. `null`, arrays and objects
    /// yield `None`.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            Value::Bool(b) => Some(Self(b.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// The identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProfileId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Reads a finite number from a JSON number or a numeric string.
///
/// # Errors
///
/// Returns [`CarbonError::InvalidField`] naming `field` for any other value.
pub(crate) fn parse_number(field: &str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| CarbonError::InvalidField {
            field: field.to_string(),
            reason: format!("expected a number, got {value}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_number_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_number("x", &json!(2.5)).expect("number"), 2.5);
        assert_eq!(parse_number("x", &json!(" 7 ")).expect("string"), 7.0);
    }

    #[test]
    fn test_parse_number_rejects_other_values() {
        for value in [json!("lots"), json!(true), json!([1]), json!("NaN"), json!("inf")] {
            match parse_number("avg_lpg_kg", &value) {
                Err(CarbonError::InvalidField { field, .. }) => assert_eq!(field, "avg_lpg_kg"),
                other => panic!("{value} gave {other:?}"),
            }
        }
    }

    #[test]
    fn test_missing_fields_are_none() {
        let p = UserProfile::from_value(0, json!({})).expect("empty object is a profile");
        assert_eq!(p, UserProfile::default());
    }

    #[test]
    fn test_null_metric_is_none() {
        let p = UserProfile::from_value(0, json!({"avg_lpg_kg": null})).expect("parse");
        assert!(p.avg_lpg_kg.is_none());
    }

    #[test]
    fn test_numeric_ids_match_as_strings() {
        let p = UserProfile::from_value(0, json!({"userId": 42})).expect("parse");
        assert!(p.matches_id("42"));
        assert!(!p.matches_id("43"));
    }

    #[test]
    fn test_either_identifier_matches() {
        let p = UserProfile::from_value(0, json!({"_id": "abc", "userId": "u7"})).expect("parse");
        assert!(p.matches_id("abc"));
        assert!(p.matches_id("u7"));
        assert_eq!(p.ids().len(), 2);
    }

    #[test]
    fn test_non_numeric_metric_is_invalid_field() {
        let err = UserProfile::from_value(3, json!({"avg_electricity_kwh": "lots"}))
            .expect_err("string metric rejected");
        match err {
            CarbonError::InvalidField { field, .. } => assert_eq!(field, "profiles[3]"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_object_is_invalid_field() {
        assert!(UserProfile::from_value(0, json!([1, 2])).is_err());
    }

    #[test]
    fn test_round_trip_keeps_extra_and_skips_absent() {
        let input = json!({"_id": "x", "avg_daily_travel_km": 4.0, "name": "Asha"});
        let p = UserProfile::from_value(0, input.clone()).expect("parse");
        assert_eq!(serde_json::to_value(&p).expect("serialize"), input);
    }

    #[test]
    fn test_transport_emission_key_spelling() {
        let p = UserProfile::from_value(0, json!({"avg_transport_emission_kgCO2": 2.2}))
            .expect("parse");
        assert_eq!(p.avg_transport_emission_kg_co2, Some(2.2));
    }
}
