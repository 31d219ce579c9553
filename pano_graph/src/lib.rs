//! Location graph for panorama walkthroughs.
//!
//! A graph maps location names to a panorama asset plus up to one outgoing
//! edge per [`Direction`]. It is built once from a JSON object whose key order
//! is preserved, so the first declared location is the default start. Edges
//! are directed and are not checked against the declared locations at build
//! time; a missing target only fails when someone tries to walk there.

pub mod direction;
pub mod graph;

pub use direction::{Direction, UnknownDirection};
pub use graph::{
    DanglingEdge, EnvironmentGraph, EnvironmentNode, GraphError, GraphLookupError, NodeConfig,
};
