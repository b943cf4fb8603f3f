//! client library for the food ordering storefront
//!
//! Talks to the storefront REST backend: keeps the signed-in session, fetches the menu,
//! mutates the server-side cart and places orders.

pub mod client;

pub use client::error::{ClientError, StorageError, ValidationError};
pub use client::state::Storefront;
