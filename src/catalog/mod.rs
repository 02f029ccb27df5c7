//! Cursor-paginated discovery of stations in a STAC collection.

pub mod client;
pub mod error;
