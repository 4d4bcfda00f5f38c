//! Carbonsense: household carbon footprint analytics in pure Rust.
//!
//! Carbonsense segments user lifestyle profiles into labeled clusters,
//! predicts next month's emission with a random forest trained on a
//! synthetic corpus, and turns both into reduction advice.
//!
//! # Quick Start
//!
//! ```
//! use carbonsense::prelude::*;
//! use serde_json::json;
//!
//! let profiles = vec![
//!     UserProfile::from_value(0, json!({"_id": "a", "avg_daily_travel_km": 1})).unwrap(),
//!     UserProfile::from_value(1, json!({"_id": "b", "avg_daily_travel_km": 80})).unwrap(),
//! ];
//!
//! let outcome = SegmentationEngine::new(2)
//!     .segment(profiles, &mut FeatureNormalizer::seeded(7))
//!     .unwrap();
//! assert_eq!(outcome.len(), 2);
//! assert!(outcome.find_user("a").is_ok());
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Vector and Matrix types
//! - [`cluster`]: K-Means clustering
//! - [`tree`]: Regression trees and random forests
//! - [`preprocessing`]: Standard scaling
//! - [`metrics`]: Regression and clustering metrics
//! - [`serialization`]: SafeTensors and atomic writes
//! - [`profile`], [`features`], [`segment`]: Lifestyle segmentation
//! - [`predict`], [`model`], [`synthetic`]: Emission prediction
//! - [`recommend`], [`rules`]: Reduction advice
//! - [`calculator`]: Single-activity daily emission
//! - [`service`]: Request handlers over all of the above
//! - [`config`]: TOML and environment configuration

pub mod calculator;
pub mod cluster;
pub mod config;
pub mod error;
pub mod features;
pub mod metrics;
pub mod model;
pub mod predict;
pub mod prelude;
pub mod preprocessing;
pub mod primitives;
pub mod profile;
pub mod recommend;
pub mod rules;
pub mod segment;
pub mod serialization;
pub mod service;
pub mod synthetic;
pub mod traits;
pub mod tree;

pub use error::{CarbonError, Result};
pub use primitives::{Matrix, Vector};
pub use traits::{Estimator, Transformer, UnsupervisedEstimator};
