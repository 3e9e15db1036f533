pub mod traits;
pub mod directed;

pub use traits::{Graph, MutableGraph};
pub use directed::DirectedGraph;
