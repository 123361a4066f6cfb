#![allow(clippy::result_large_err)]

//! # Sapling - Property-Based Testing with Integrated Shrinking
//!
//! Sapling generates random test data, runs a property against it, and on
//! failure reduces the input to a locally minimal counterexample. Instead
//! of pairing every generator with a bespoke shrinker, each draw produces a
//! lazy rose tree whose root is the generated value and whose children are
//! smaller candidates; combinators operate on the tree, so shrinking is
//! derived automatically and survives `map`, `bind` and `filter`
//! composition.
//!
//! ## Quick Start
//!
//! ```rust
//! use sapling::{Config, Failure, check_all, int_in_range, list_of};
//!
//! let config = Config::default().with_seed(0);
//! let result = check_all(list_of(int_in_range(0i64..=100), ..), &config, |items| {
//!     if items.iter().all(|n| (0..=100).contains(n)) {
//!         Ok(())
//!     } else {
//!         Err(Failure::assertion("element out of range"))
//!     }
//! });
//! assert!(result.is_ok());
//! ```

// Public modules
pub mod error;
pub mod generator;
pub mod lift;
pub mod primitives;
pub mod runner;
pub mod sample;
pub mod seed;
pub mod tree;

// Re-export the main public API
pub use error::{ConfigError, GenError};
pub use generator::{
    DEFAULT_FILTER_RETRIES, Gen, constant, frequency, member_of, one_of, sized, tree,
};
pub use lift::IntoGen;
pub use primitives::*;
pub use runner::{
    Binding, CheckError, CheckFailure, CheckSuccess, Config, Failure, FailureKind, assert_all,
    check_all,
};
pub use sample::{Samples, pick, samples, take};
pub use seed::Seed;
pub use tree::LazyTree;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_composition() {
        let gen = list_of(tuple2(int_in_range(0i64..=10), boolean()), 0..=5);
        let config = Config::default().with_seed(1);
        let result = check_all(gen, &config, |pairs| {
            if pairs.len() <= 5 {
                Ok(())
            } else {
                Err(Failure::assertion("list too long"))
            }
        });
        assert_eq!(result.unwrap().runs, 100);
    }

    #[test]
    fn test_literals_work_where_generators_are_expected() {
        let gen = list_of((0i64, boolean()), 1..=3);
        let values = gen
            .run_tree(Seed::new(1), 10)
            .unwrap()
            .root;
        assert!(values.iter().all(|(n, _)| *n == 0));
    }

    #[test]
    fn test_sampling_surface() {
        let values = take(int_in_range(0i64..=10), 10).unwrap();
        assert_eq!(values.len(), 10);
        assert!(values.iter().all(|n| (0..=10).contains(n)));
    }
}
