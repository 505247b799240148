//! Bramble Core - Shared types library.
//!
//! This crate provides common types used across the Bramble components:
//! - `client` - Storefront client engine (HTTP services, state containers)
//! - `integration-tests` - End-to-end flow tests against a mock backend
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. Everything
//! the commerce backend owns (carts, orders, prices) is referenced here by
//! opaque string identifiers; the backend is the source of truth.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, prices, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
