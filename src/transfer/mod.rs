//! Tier-aware, idempotent mirroring of single assets to disk.

pub mod error;
pub mod fetcher;
mod locks;
