//! Domain layer types and invariants.

pub mod dates;
pub mod error;
pub mod filters;
pub mod images;
pub mod properties;
pub mod query;
