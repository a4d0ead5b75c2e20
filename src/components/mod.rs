/// Canvas force-directed graph.
pub mod force_graph;
