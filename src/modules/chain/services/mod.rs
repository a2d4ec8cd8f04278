pub mod chain_service;

pub use chain_service::{ChainAcceptOutcome, ChainService, ChainStep};
