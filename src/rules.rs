//! Ordered first-match rule lists.
//!
//! Threshold cascades (lifestyle labeling, breakdown advice triggers) are
//! expressed as a slice of [`Rule`]s evaluated top to bottom; the first rule
//! whose predicate holds decides the outcome.
//!
//! # Example
//!
//! ```
//! use carbonsense::rules::{first_match, Rule};
//!
//! const SIGN: &[Rule<i32, &str>] = &[
//!     Rule::new("negative", |v| *v < 0, "neg"),
//!     Rule::new("zero", |v| *v == 0, "zero"),
//! ];
//!
//! assert_eq!(first_match(SIGN, &-3), Some(&"neg"));
//! assert_eq!(first_match(SIGN, &5), None);
//! ```

/// A named `(predicate, outcome)` pair.
#[derive(Debug, Clone, Copy)]
pub struct Rule<T, R> {
    /// Short identifier used in logs and tests
    pub name: &'static str,
    /// Condition evaluated against the subject
    pub predicate: fn(&T) -> bool,
    /// Result produced when the predicate holds
    pub outcome: R,
}

impl<T, R> Rule<T, R> {
    /// Creates a rule.
    #[must_use]
    pub const fn new(name: &'static str, predicate: fn(&T) -> bool, outcome: R) -> Self {
        Self {
            name,
            predicate,
            outcome,
        }
    }

    /// Returns true when this rule applies to `subject`.
    #[must_use]
    pub fn matches(&self, subject: &T) -> bool {
        (self.predicate)(subject)
    }
}

/// Returns the outcome of the first rule whose predicate holds for `subject`.
#[must_use]
pub fn first_match<'a, T, R>(rules: &'a [Rule<T, R>], subject: &T) -> Option<&'a R> {
    first_matching_rule(rules, subject).map(|rule| &rule.outcome)
}

/// Returns the first rule whose predicate holds for `subject`.
#[must_use]
pub fn first_matching_rule<'a, T, R>(
    rules: &'a [Rule<T, R>],
    subject: &T,
) -> Option<&'a Rule<T, R>> {
    rules.iter().find(|rule| rule.matches(subject))
}
