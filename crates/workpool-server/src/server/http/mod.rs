//! HTTP request counter served next to the worker pool.
//!
//! ## Structure
//!
//! - [`counter`] - Injected, shared request counter (`RequestCounter`).
//! - [`handler`] - Axum router, handler, and graceful server loop.

pub mod counter;
pub mod handler;

pub use counter::RequestCounter;
pub use handler::{router, serve};
