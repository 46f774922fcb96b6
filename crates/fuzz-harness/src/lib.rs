//! SX9 Orbital Fuzz Harness
//!
//! Property-test strategies and synthetic inputs for the threat assessment
//! workspace. Nothing here is reachable from a scoring code path; the crate is
//! only ever a dev-dependency.
//!
//! # Usage
//!
//! ```rust
//! use fuzz_harness::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn my_fuzz_test(p in prior()) {
//!         prop_assert!(p > 0.0 && p < 1.0);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub mod prelude {
    pub use crate::fixtures::{gp_record, tle_lines, walker_records, KeplerianSeed, WalkerDelta};
    pub use crate::generators::*;
    pub use proptest::prelude::*;
}

// Re-export proptest for convenience
pub use proptest;
