pub mod chain_node;

pub use chain_node::{ChainNode, ChainNodeKind};
