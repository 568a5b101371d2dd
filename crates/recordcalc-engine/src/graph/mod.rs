mod dependency_graph;

pub use dependency_graph::{detect_cycles, DependencyGraph};
