pub mod station;
pub mod summary;
pub mod tier;
