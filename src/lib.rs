//! Character-sheet filling: pick field positions on a template PDF, then
//! stamp data values at those positions onto the template's first page.

pub mod config;
pub mod coords;
pub mod error;
pub mod fields;
pub mod fill;
pub mod grid;
pub mod overlay;
pub mod pdf;
pub mod picker;
pub mod positions;
pub mod sanitize;

pub use error::{CardError, Result};
pub use fill::{FillOptions, fill_card};
pub use grid::export_grid_pdf;
pub use picker::{PickOptions, pick_positions};
pub use positions::{PositionMap, PositionRecord};
