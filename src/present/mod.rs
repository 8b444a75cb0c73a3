//! Presentation models derived from the last detection result.
//!
//! Nothing here mutates detection data; views are rebuilt from the result and the
//! current `FilterState` on every change.

pub mod filter;
pub mod overlay;
pub mod result_list;

pub use filter::FilterState;
pub use overlay::{draw_overlays, render_preview, visible_overlays, BoundingBoxOverlay};
pub use result_list::{sorted_indices, CategoryChip, Emphasis, ResultListView, ResultRow};
