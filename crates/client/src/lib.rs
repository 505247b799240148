//! Bramble storefront client engine.
//!
//! This crate is the logic layer of a mobile storefront built atop a
//! headless-commerce backend's store/auth HTTP APIs. It contains no UI:
//! screens inject the pieces they need and render whatever state the
//! containers hold.
//!
//! # Architecture
//!
//! - [`http::ApiClient`] - outbound HTTP adapter; attaches the publishable
//!   API key to every request and a bearer token when one is stored
//! - [`storage`] - on-device key-value persistence seam (token, cart id,
//!   cached region)
//! - [`services`] - thin typed wrappers per backend resource
//! - [`state`] - the three state containers: session, region, cart
//! - [`checkout`] - the multi-step checkout sequencer
//! - [`deeplink`] - password-reset deep-link parsing
//!
//! The backend owns every entity; containers hold at most one in-memory
//! copy each and replace it wholesale with the server response on every
//! successful mutation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod config;
pub mod deeplink;
pub mod error;
pub mod http;
pub mod services;
pub mod state;
pub mod storage;
pub mod types;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use http::ApiClient;
