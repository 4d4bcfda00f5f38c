//! Synthetic training corpus for the emission model.
//!
//! Each row draws the six model inputs uniformly from plausible household
//! ranges. The target averages the fixed-factor monthly total with a jittered
//! copy of last month's emission, plus Gaussian noise:
//!
//! ```text
//! target = (breakdown_total + last_month * U(0.8, 1.2)) / 2 + N(0, 10)
//! ```
//!
//! Columns are drawn one after another from a single seeded generator, so a
//! given `(n_samples, seed)` always yields the same corpus.
//!
//! # Example
//!
//! ```
//! use carbonsense::synthetic::SyntheticGenerator;
//!
//! let corpus = SyntheticGenerator::new(50).with_seed(42).generate().expect("valid size");
//! assert_eq!(corpus.inputs.shape(), (50, 6));
//! assert_eq!(corpus.target.len(), 50);
//! ```

use crate::error::{CarbonError, Result};
use crate::predict::{EmissionBreakdown, ProfileInputs, N_INPUTS};
use crate::primitives::{Matrix, Vector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Uniform sampling range per model input, in input order.
pub const INPUT_RANGES: [(f64, f64); N_INPUTS] = [
    (5.0, 50.0),
    (100.0, 500.0),
    (5.0, 30.0),
    (0.0, 20.0),
    (0.0, 15.0),
    (50.0, 400.0),
];

/// Range of the multiplicative jitter on last month's emission.
pub const LAST_MONTH_JITTER: (f64, f64) = (0.8, 1.2);

/// Standard deviation of the additive target noise.
pub const NOISE_STD: f64 = 10.0;

/// Generated inputs and targets.
#[derive(Debug, Clone)]
pub struct TrainingCorpus {
    /// `n_samples x 6` raw (unscaled) inputs
    pub inputs: Matrix<f32>,
    /// Target monthly emission per row
    pub target: Vector<f32>,
}

impl TrainingCorpus {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.target.len()
    }

    /// Returns true if the corpus has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }
}

/// Deterministic corpus generator.
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    n_samples: usize,
    seed: u64,
}

impl SyntheticGenerator {
    /// Generator for `n_samples` rows with seed 42.
    #[must_use]
    pub fn new(n_samples: usize) -> Self {
        Self {
            n_samples,
            seed: 42,
        }
    }

    /// Sets the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Draws the corpus.
    ///
    /// # Errors
    ///
    /// Returns [`CarbonError::InvalidHyperparameter`] when `n_samples` is 0.
    pub fn generate(&self) -> Result<TrainingCorpus> {
        let n = self.n_samples;
        if n == 0 {
            return Err(CarbonError::InvalidHyperparameter {
                param: "training_samples".to_string(),
                value: "0".to_string(),
                constraint: ">= 1".to_string(),
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let columns: Vec<Vec<f64>> = INPUT_RANGES
            .iter()
            .map(|&(low, high)| (0..n).map(|_| rng.gen_range(low..high)).collect())
            .collect();
        let jitter: Vec<f64> = (0..n)
            .map(|_| rng.gen_range(LAST_MONTH_JITTER.0..LAST_MONTH_JITTER.1))
            .collect();
        let noise: Vec<f64> = (0..n).map(|_| NOISE_STD * standard_normal(&mut rng)).collect();

        let mut data = Vec::with_capacity(n * N_INPUTS);
        let mut target = Vec::with_capacity(n);
        for row in 0..n {
            let mut values = [0.0; N_INPUTS];
            for (slot, column) in values.iter_mut().zip(&columns) {
                *slot = column[row];
            }
            let inputs = ProfileInputs::from_array(values);
            let total = EmissionBreakdown::from_inputs(&inputs).total();
            let y = (total + inputs.last_month_emission * jitter[row]) / 2.0 + noise[row];

            data.extend(values.iter().map(|&v| v as f32));
            target.push(y as f32);
        }

        Ok(TrainingCorpus {
            inputs: Matrix::from_vec(n, N_INPUTS, data)?,
            target: Vector::from_vec(target),
        })
    }
}

/// One draw from N(0, 1) by the Box-Muller transform.
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // 1 - U[0,1) lies in (0,1], keeping ln finite
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_corpus() {
        let a = SyntheticGenerator::new(30).generate().expect("generate");
        let b = SyntheticGenerator::new(30).generate().expect("generate");
        assert_eq!(a.inputs, b.inputs);
        assert_eq!(a.target, b.target);
    }

    #[test]
    fn test_different_seed_differs() {
        let a = SyntheticGenerator::new(30).with_seed(1).generate().expect("generate");
        let b = SyntheticGenerator::new(30).with_seed(2).generate().expect("generate");
        assert_ne!(a.inputs, b.inputs);
    }

    #[test]
    fn test_inputs_within_ranges() {
        let corpus = SyntheticGenerator::new(200).generate().expect("generate");
        for row in 0..corpus.len() {
            for (col, &(low, high)) in INPUT_RANGES.iter().enumerate() {
                let v = f64::from(corpus.inputs.get(row, col));
                assert!(v >= low - 1e-3 && v <= high + 1e-3, "row {row} col {col}: {v}");
            }
        }
    }

    #[test]
    fn test_target_tracks_formula_within_noise() {
        let corpus = SyntheticGenerator::new(500).generate().expect("generate");
        let mut residuals = Vec::with_capacity(corpus.len());
        for row in 0..corpus.len() {
            let values: Vec<f64> = (0..N_INPUTS)
                .map(|c| f64::from(corpus.inputs.get(row, c)))
                .collect();
            let mut arr = [0.0; N_INPUTS];
            arr.copy_from_slice(&values);
            let inputs = ProfileInputs::from_array(arr);
            let expected =
                (EmissionBreakdown::from_inputs(&inputs).total() + inputs.last_month_emission) / 2.0;
            residuals.push(f64::from(corpus.target[row]) - expected);
        }
        let mean = residuals.iter().sum::<f64>() / residuals.len() as f64;
        // jitter is centred on 1 and noise on 0
        assert!(mean.abs() < 5.0, "mean residual {mean}");
    }

    #[test]
    fn test_standard_normal_moments() {
        let mut rng = StdRng::seed_from_u64(7);
        let draws: Vec<f64> = (0..20_000).map(|_| standard_normal(&mut rng)).collect();
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        let var = draws.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / draws.len() as f64;
        assert!(mean.abs() < 0.05);
        assert!((var - 1.0).abs() < 0.05);
        assert!(draws.iter().all(|d| d.is_finite()));
    }

    #[test]
    fn test_zero_samples_rejected() {
        assert!(SyntheticGenerator::new(0).generate().is_err());
    }
}
