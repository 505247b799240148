//! Shared application state containers.
//!
//! The session, region, and cart containers are explicit, independently
//! testable state holders. Each is cheaply cloneable via `Arc`; clones
//! share the same state, and screens receive the containers they need by
//! dependency passing.

pub mod cart;
pub mod region;
pub mod session;

pub use cart::CartState;
pub use region::RegionState;
pub use session::Session;
