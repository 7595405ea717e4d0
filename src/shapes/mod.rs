//! Target shapes and the date-driven daily rotation.

mod catalog;
mod daily;

pub use catalog::{CatalogError, Shape, ShapeCatalog};
pub use daily::{days_since_epoch, shape_for_date, shape_for_day};
