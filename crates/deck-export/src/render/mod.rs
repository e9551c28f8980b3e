//! Raster page composer
//!
//! - `codec`: the image collaborator trait and its `image`-crate implementation
//! - `compose`: page-sized rasters from page descriptors
//! - `marks`: crop marks and fold lines

mod codec;
mod compose;
mod marks;

pub use codec::*;
pub use compose::*;
pub use marks::{draw_crop_marks, draw_fold_line};
