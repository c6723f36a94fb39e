//! Exit codes for the CLI

/// General error
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// Validation error
pub const VALIDATION_ERROR: i32 = 5;
