//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use carbonsense::prelude::*;
//! ```

pub use crate::cluster::KMeans;
pub use crate::error::{CarbonError, Result};
pub use crate::features::{FeatureNormalizer, FeatureVector};
pub use crate::metrics::{inertia, mse, r_squared};
pub use crate::predict::{EmissionPredictor, PredictionInput, PredictionResult};
pub use crate::preprocessing::StandardScaler;
pub use crate::primitives::{Matrix, Vector};
pub use crate::profile::UserProfile;
pub use crate::segment::{ClusterOutcome, SegmentationEngine};
pub use crate::service::CarbonService;
pub use crate::traits::{Estimator, Transformer, UnsupervisedEstimator};
pub use crate::tree::RandomForestRegressor;
