//! Typed wrapper functions per backend resource.
//!
//! Each wrapper builds a request path/body, calls the shared [`ApiClient`],
//! logs, and returns the typed result. No retries, no per-call timeouts.
//!
//! [`ApiClient`]: crate::http::ApiClient

pub mod auth;
pub mod carts;
pub mod customers;
pub mod orders;
pub mod payments;
pub mod products;
pub mod regions;

pub use products::ProductService;
