//! Force-directed graph: payload reconciliation, render traversal, physics
//! coupling and the canvas component that drives them.

/// Source id to outgoing links.
pub mod adjacency;
mod component;
pub mod config;
/// Error taxonomy.
pub mod error;
pub mod registry;
mod render;
pub mod scheduler;
pub mod simulation;
/// One graph instance and its pointer handling.
pub mod state;
pub mod traversal;
/// Incoming graph payload.
pub mod types;
pub mod viewport;

pub use component::ForceGraphCanvas;
pub use config::GraphConfig;
pub use error::{GraphError, Result};
pub use state::ForceGraphState;
pub use types::{GraphData, GraphLink, GraphNode};
