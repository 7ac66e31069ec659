//! Project Management
//!
//! Handles loading and saving project files from disk.

mod asset;
mod config;
mod loader;

pub use asset::*;
pub use config::*;
pub use loader::*;
