//! Blueprint project tooling
//!
//! Loads a project directory into an editor session, runs the load pipeline
//! over every Blueprint asset and applies batch edits.

// Project files on disk
pub mod project;

// Loaded editor session
pub mod session;

// Command-line argument parsing helpers
pub mod commands;
