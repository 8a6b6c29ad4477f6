//! Shared geometry for tileset aggregation: geographic bounding regions,
//! Cartesian extent boxes, and the three-valued containment comparator.
//!
//! # Invariants
//! - Containment is a partial order; `Incomparable` is a legal verdict, not
//!   an error, and no code may assume transitivity.
//! - `RegionBounds` yields a region only after at least one contribution.

mod extent;
mod region;

pub use extent::{Containment, ExtentBox, axis_containment};
pub use region::{Region, RegionBounds};
