//! Infrastructure adapters and runtime bootstrap.

pub mod db;
pub mod error;
pub mod smw;
pub mod telemetry;
