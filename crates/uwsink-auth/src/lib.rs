//! uwsink Authentication - First-Receiver Election and Credential Hand-off
//!
//! Mobile source nodes may be heard by several sinks at once. This crate lets
//! those sinks agree, without talking to each other, on:
//!
//! - **who reacts** to a given packet instance: the single winner of an
//!   atomic first-receiver election in the shared store
//! - **whether the source is authenticated**: expiring credentials owned by
//!   one sink at a time, with an explicit hand-off record when the source
//!   roams to another sink
//!
//! There is no central authority and nothing is revoked. Expiry is decided at
//! read time by comparing stored timestamps with the caller's clock.
//!
//! # Example
//!
//! ```
//! use uwsink_auth::{AuthConfig, AuthCoordinator, RequestRole, ResponseRole};
//! use uwsink_store::MemoryStore;
//!
//! let mut store = MemoryStore::new();
//! let mut sink = AuthCoordinator::new(7, AuthConfig::default().with_key_expiry(30.0));
//!
//! if sink.elect(&mut store, 1, 1).unwrap() {
//!     let decision = sink.authenticate(&mut store, 1, RequestRole::AuthRequest, 0.0).unwrap();
//!     assert_eq!(decision.response(), Some(ResponseRole::AuthGrant));
//! }
//! ```

pub mod coordinator;
pub mod error;
pub mod role;

pub use coordinator::{AuthConfig, AuthCoordinator, Decision};
pub use error::{Error, Result};
pub use role::{tags, RequestRole, ResponseRole};
