//! Sheet layout engine
//!
//! This module handles all the geometric calculations for printing cards:
//! - Grid layout (how many cells fit, where the block sits, fold line)
//! - Card placement (fronts, mirrored or folded backs, bleed coverage)

mod grid;
mod placement;
mod types;

pub use grid::*;
pub use placement::layout;
pub(crate) use placement::{BackAlignment, layout_with};
pub use types::*;
