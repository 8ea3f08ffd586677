//! Error types for toolpath generation.

use thiserror::Error;

/// Errors that can occur before or during toolpath generation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolpathError {
    /// A setting is outside its valid range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// A value sweep runs in the opposite direction to its step.
    #[error("{name} sweep from {start} to {end} cannot be reached with step {step}")]
    SweepDirection {
        /// Name of the swept quantity.
        name: &'static str,
        /// First value of the sweep.
        start: f64,
        /// Last value of the sweep.
        end: f64,
        /// Increment per pattern or segment.
        step: f64,
    },

    /// Pattern geometry is degenerate.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
}

/// Result type for toolpath operations.
pub type Result<T> = std::result::Result<T, ToolpathError>;
