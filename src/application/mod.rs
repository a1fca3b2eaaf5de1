//! Application services: facet resolution, image lookup and the catalog listings.

pub mod catalog;
pub mod error;
pub mod facets;
pub mod images;
pub mod pagination;
pub mod repos;
