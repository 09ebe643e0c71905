//! External collaborator boundaries: interfaces the core engine depends on
//! but does not implement itself.

pub mod font_metrics;

pub use font_metrics::{FixedWidthMetrics, FontMetrics};
