pub mod chain_controller;

pub use chain_controller::ChainController;
