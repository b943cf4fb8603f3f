//! main module for the storefront client

pub mod controller;
pub mod error;
pub mod gateway;
pub mod model;
pub mod session;
pub mod state;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::cart::CartController;
pub use controller::order::OrderSubmitter;
pub use gateway::ApiGateway;
pub use session::{FileStorage, MemoryStorage, SessionStore, Storage};
