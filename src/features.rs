//! Feature normalization for the clustering path.
//!
//! Every profile is turned into a [`FeatureVector`] of seven values in a
//! fixed canonical order. Missing metrics are derived from related fields
//! where a rule exists and default to 0 otherwise.
//!
//! | Feature | Supplied key | Fallback |
//! |---|---|---|
//! | transport emission | `avg_transport_emission_kgCO2` | `avg_daily_travel_km * 0.21`, else 0 |
//! | electricity | `avg_electricity_kwh` | 0 |
//! | LPG | `avg_lpg_kg` | 0 |
//! | non-veg meals | `avg_nonveg_meals` | 0 |
//! | waste generated | `avg_waste_generated_kg` | uniform draw in `[0.4, 1.5)` |
//! | purchases per day | `avg_purchases_per_day` | `avg_items_purchased / 30`, else 0 |
//! | renewable usage | `avg_renewable_usage` | 0 |
//!
//! The waste fallback is random. The generator is injected so callers can
//! pin it; an unseeded normalizer gives a different draw on every call.

use crate::error::{CarbonError, Result};
use crate::profile::UserProfile;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Number of features in a [`FeatureVector`].
pub const N_FEATURES: usize = 7;

/// Canonical feature names, in vector order.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "avg_transport_emission_kgCO2",
    "avg_electricity_kwh",
    "avg_lpg_kg",
    "avg_nonveg_meals",
    "avg_waste_generated_kg",
    "avg_purchases_per_day",
    "avg_renewable_usage",
];

/// kg CO2 emitted per km travelled.
pub const TRANSPORT_KG_CO2_PER_KM: f64 = 0.21;

/// Range of the synthetic waste draw, in kg.
pub const WASTE_FALLBACK_RANGE: (f64, f64) = (0.4, 1.5);

/// Days used to turn monthly purchases into a daily rate.
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Seven derived features in canonical order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Transport emission (kg CO2)
    #[serde(rename = "avg_transport_emission_kgCO2")]
    pub transport_emission: f64,
    /// Electricity consumption (kWh)
    #[serde(rename = "avg_electricity_kwh")]
    pub electricity: f64,
    /// Cooking gas (kg)
    #[serde(rename = "avg_lpg_kg")]
    pub lpg: f64,
    /// Non-vegetarian meals
    #[serde(rename = "avg_nonveg_meals")]
    pub nonveg_meals: f64,
    /// Waste generated (kg)
    #[serde(rename = "avg_waste_generated_kg")]
    pub waste_generated: f64,
    /// Purchases per day
    #[serde(rename = "avg_purchases_per_day")]
    pub purchases_per_day: f64,
    /// Renewable usage share
    #[serde(rename = "avg_renewable_usage")]
    pub renewable_usage: f64,
}

impl FeatureVector {
    /// Values in canonical order.
    #[must_use]
    pub fn to_array(&self) -> [f64; N_FEATURES] {
        [
            self.transport_emission,
            self.electricity,
            self.lpg,
            self.nonveg_meals,
            self.waste_generated,
            self.purchases_per_day,
            self.renewable_usage,
        ]
    }

    /// Builds a vector from values in canonical order.
    #[must_use]
    pub fn from_array(values: [f64; N_FEATURES]) -> Self {
        let [transport_emission, electricity, lpg, nonveg_meals, waste_generated, purchases_per_day, renewable_usage] =
            values;
        Self {
            transport_emission,
            electricity,
            lpg,
            nonveg_meals,
            waste_generated,
            purchases_per_day,
            renewable_usage,
        }
    }

    /// `(name, value)` pairs in canonical order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> {
        FEATURE_NAMES.into_iter().zip(self.to_array())
    }
}

/// Derives [`FeatureVector`]s from profiles.
///
/// # Examples
///
/// ```
/// use carbonsense::features::FeatureNormalizer;
/// use carbonsense::profile::UserProfile;
///
/// let profile = UserProfile {
///     avg_daily_travel_km: Some(10.0),
///     avg_items_purchased: Some(15.0),
///     ..UserProfile::default()
/// };
///
/// let mut normalizer = FeatureNormalizer::seeded(7);
/// let features = normalizer.normalize(&profile);
/// assert!((features.transport_emission - 2.1).abs() < 1e-12);
/// assert!((features.purchases_per_day - 0.5).abs() < 1e-12);
/// assert!((0.4..1.5).contains(&features.waste_generated));
/// ```
#[derive(Debug, Clone)]
pub struct FeatureNormalizer<R> {
    rng: R,
}

impl<R: Rng> FeatureNormalizer<R> {
    /// Creates a normalizer drawing waste fallbacks from `rng`.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Derives the feature vector for one profile.
    pub fn normalize(&mut self, profile: &UserProfile) -> FeatureVector {
        let transport_emission = profile
            .avg_transport_emission_kg_co2
            .or_else(|| profile.avg_daily_travel_km.map(|km| km * TRANSPORT_KG_CO2_PER_KM))
            .unwrap_or(0.0);

        let waste_generated = match profile.avg_waste_generated_kg {
            Some(kg) => kg,
            None => self
                .rng
                .gen_range(WASTE_FALLBACK_RANGE.0..WASTE_FALLBACK_RANGE.1),
        };

        let purchases_per_day = profile
            .avg_purchases_per_day
            .or_else(|| profile.avg_items_purchased.map(|items| items / DAYS_PER_MONTH))
            .unwrap_or(0.0);

        FeatureVector {
            transport_emission,
            electricity: profile.avg_electricity_kwh.unwrap_or(0.0),
            lpg: profile.avg_lpg_kg.unwrap_or(0.0),
            nonveg_meals: profile.avg_nonveg_meals.unwrap_or(0.0),
            waste_generated,
            purchases_per_day,
            renewable_usage: profile.avg_renewable_usage.unwrap_or(0.0),
        }
    }

    /// Derives one feature vector per profile, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::EmptyInput`] for an empty batch.
    pub fn normalize_batch(&mut self, profiles: &[UserProfile]) -> Result<Vec<FeatureVector>> {
        if profiles.is_empty() {
            return Err(CarbonError::empty_input("no profiles provided"));
        }
        Ok(profiles.iter().map(|p| self.normalize(p)).collect())
    }
}

impl FeatureNormalizer<StdRng> {
    /// Normalizer with a fixed seed, for reproducible waste draws.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Normalizer seeded from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}
