pub mod edge_set;
mod node;

pub use crate::edge_set::{Edge, EdgeSet};
