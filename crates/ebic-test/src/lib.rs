//! ebic-test - Regression test framework
//!
//! Tests record numbered checks in a [`RegParams`] and report all failures
//! at the end, in one of three modes:
//!
//! - **Generate**: write golden files for later comparison
//! - **Compare**: compare results with golden files (default)
//! - **Display**: run the checks and keep outputs for inspection
//!
//! # Usage
//!
//! ```no_run
//! use ebic_test::RegParams;
//!
//! let mut rp = RegParams::new("histogram");
//! rp.compare_values(1.0, 1.0, 0.0);
//! assert!(rp.cleanup());
//! ```
//!
//! # Environment Variables
//!
//! - `REGTEST_MODE`: Set to "generate", "compare", or "display"

mod error;
mod params;
pub mod synthetic;

pub use error::{TestError, TestResult};
pub use params::{RegParams, RegTestMode};

/// Get the path to the workspace root
fn workspace_root() -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    // ebic-test is at crates/ebic-test
    format!("{}/../..", manifest_dir)
}

/// Get the path to the golden files directory
pub fn golden_dir() -> String {
    format!("{}/tests/golden", workspace_root())
}

/// Get the path to the regout (regression output) directory
pub fn regout_dir() -> String {
    format!("{}/tests/regout", workspace_root())
}

/// Path of a scratch file in the regout directory
pub fn regout_path(name: &str) -> String {
    format!("{}/{}", regout_dir(), name)
}
