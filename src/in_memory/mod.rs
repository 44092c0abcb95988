mod arena;

pub use arena::{Arena, NodeId};
