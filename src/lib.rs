//! gamedex: filtered, sorted and paginated catalog listings over a Semantic MediaWiki property
//! store, served through a versioned group-invalidation cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
