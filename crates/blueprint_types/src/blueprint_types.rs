//! Blueprint Types - Data model for the Blueprint editing pipeline
//!
//! This crate holds the pure data structures: pin types and default values,
//! the versioned class registry, member references, nodes, graphs and the
//! Blueprint assets that own them. Orchestration lives in `blueprint_editor`.

mod blueprint;
mod class;
mod graph;
mod member_reference;
mod node;
mod type_registry;
mod types;
mod value;

pub use blueprint::*;
pub use class::*;
pub use graph::*;
pub use member_reference::*;
pub use node::*;
pub use type_registry::*;
pub use types::*;
pub use value::*;
