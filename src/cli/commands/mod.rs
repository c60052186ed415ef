//! CLI command implementations
//!
//! Commands return the process exit code so detection can report a clean
//! non-match (100) distinctly from an error (1).

pub mod build;
pub mod detect;

pub use build::execute as build;
pub use detect::execute as detect;

/// Exit code of a passing detection or successful build
pub const EXIT_PASS: u8 = 0;

/// Exit code of a failing detection
pub const EXIT_DETECT_FAIL: u8 = 100;
