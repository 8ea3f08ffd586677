//! Pattern geometry for the two calibration families.

pub mod tower;
pub mod vcorner;

pub use tower::{ConeSlice, LayerRole, Segment, TemperatureSweep, TowerPlan, TowerSpec};
pub use vcorner::{AdvanceSweep, VCornerSpec};

/// Most steps a single sweep may take.
pub const MAX_SWEEP_STEPS: f64 = 10_000.0;
