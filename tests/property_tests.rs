//! Property-based tests using proptest.
//!
//! These tests verify invariants of segmentation, labeling and the
//! recommendation catalog.

use carbonsense::features::{FeatureNormalizer, FeatureVector};
use carbonsense::predict::{EmissionBreakdown, ProfileInputs};
use carbonsense::prelude::*;
use carbonsense::recommend::{breakdown_recommendations, lifestyle_recommendations, WELL_MANAGED};
use carbonsense::segment::{label_means, LifestyleSegment};
use proptest::prelude::*;

// Strategy for generating raw profiles with every metric present
fn profile_strategy() -> impl Strategy<Value = UserProfile> {
    (
        0.0f64..120.0,
        0.0f64..600.0,
        0.0f64..40.0,
        0.0f64..30.0,
        0.0f64..60.0,
        0.0f64..1.0,
        0.0f64..5.0,
    )
        .prop_map(|(km, kwh, lpg, meals, items, renewable, waste)| UserProfile {
            avg_daily_travel_km: Some(km),
            avg_electricity_kwh: Some(kwh),
            avg_lpg_kg: Some(lpg),
            avg_nonveg_meals: Some(meals),
            avg_items_purchased: Some(items),
            avg_renewable_usage: Some(renewable),
            avg_waste_generated_kg: Some(waste),
            ..UserProfile::default()
        })
}

fn means_strategy() -> impl Strategy<Value = FeatureVector> {
    proptest::collection::vec(0.0f64..500.0, 7).prop_map(|v| {
        FeatureVector::from_array([v[0], v[1], v[2], v[3], v[4], v[5], v[6]])
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    // Segmentation properties
    #[test]
    fn every_profile_assigned_once(
        profiles in proptest::collection::vec(profile_strategy(), 1..24),
        k in 1usize..6,
    ) {
        let n = profiles.len();
        let outcome = SegmentationEngine::new(k)
            .segment(profiles, &mut FeatureNormalizer::seeded(0))
            .expect("non-empty batch");

        prop_assert_eq!(outcome.assignments().len(), n);
        prop_assert!(outcome.labels().len() <= k.min(n));
        for cluster in outcome.assignments() {
            prop_assert!(outcome.labels().contains_key(cluster));
        }
    }

    #[test]
    fn labeled_clusters_are_non_empty(
        profiles in proptest::collection::vec(profile_strategy(), 1..24),
    ) {
        let n = profiles.len();
        let outcome = SegmentationEngine::new(3)
            .segment(profiles, &mut FeatureNormalizer::seeded(1))
            .expect("non-empty batch");

        let total: usize = outcome.summaries().iter().map(|s| s.users_in_cluster).sum();
        prop_assert_eq!(total, n);
        for summary in outcome.summaries() {
            prop_assert!(summary.users_in_cluster >= 1);
            prop_assert!(outcome.labels().contains_key(&summary.cluster_label));
        }
    }

    #[test]
    fn waste_fallback_stays_in_range(seed in any::<u64>()) {
        let mut normalizer = FeatureNormalizer::seeded(seed);
        let features = normalizer.normalize(&UserProfile::default());
        prop_assert!((0.4..1.5).contains(&features.waste_generated));
    }

    // Labeling properties
    #[test]
    fn labeling_is_a_pure_function(means in means_strategy()) {
        prop_assert_eq!(label_means(&means), label_means(&means.clone()));
    }

    #[test]
    fn low_impact_requires_low_transport_and_electricity(means in means_strategy()) {
        if label_means(&means) == LifestyleSegment::LowImpact {
            prop_assert!(means.transport_emission < 1.0);
            prop_assert!(means.electricity < 4.0);
        }
    }

    // Catalog properties
    #[test]
    fn unknown_label_yields_single_fallback(label in "[a-z ]{0,24}") {
        let tips = lifestyle_recommendations(&label);
        prop_assert!(!tips.is_empty());
        if LifestyleSegment::from_label(&label).is_none() {
            prop_assert_eq!(tips.len(), 1);
        }
    }

    #[test]
    fn breakdown_advice_is_bounded(values in proptest::collection::vec(0.0f64..500.0, 6)) {
        let inputs = ProfileInputs::from_array([
            values[0], values[1], values[2], values[3], values[4], values[5],
        ]);
        let breakdown = EmissionBreakdown::from_inputs(&inputs);
        let tips = breakdown_recommendations(&breakdown.entries());

        prop_assert!(!tips.is_empty());
        prop_assert!(tips.len() <= 3);
        if tips.contains(&WELL_MANAGED) {
            prop_assert_eq!(tips.len(), 1);
        }
    }

    // Breakdown is fixed-factor arithmetic
    #[test]
    fn breakdown_matches_factors(
        km in 0.0f64..200.0,
        kwh in 0.0f64..800.0,
        lpg in 0.0f64..50.0,
        meals in 0.0f64..40.0,
        items in 0.0f64..80.0,
    ) {
        let inputs = ProfileInputs::from_array([km, kwh, lpg, meals, items, 0.0]);
        let b = EmissionBreakdown::from_inputs(&inputs);

        prop_assert_eq!(b.transport, km * 30.0 * 0.12);
        prop_assert_eq!(b.electricity, kwh * 0.92);
        prop_assert_eq!(b.lpg, lpg * 3.0);
        prop_assert_eq!(b.food, meals * 4.0 * 2.5);
        prop_assert_eq!(b.shopping, items * 4.0 * 5.0);
    }
}
