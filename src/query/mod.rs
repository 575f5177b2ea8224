//! Filter shapes and the filter/query object.
//!
//! - [`Filter`]: the single argument every repository verb takes
//!   (all rows, identifier, comparison, or a caller-built query)
//! - [`QueryFilter`]: predicate, projection, ordering and window
//! - [`Operator`]: the closed set of comparison operators

pub mod filter;
pub mod select;

pub use filter::{Filter, Operator};
pub use select::QueryFilter;
