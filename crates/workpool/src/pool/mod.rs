//! Bounded async worker pool.
//!
//! ## Structure
//!
//! - `config` - Validated sizing (`PoolConfig`).
//! - `state` - Lifecycle states (`PoolState`).
//! - `manager` - The pool itself (`WorkerPool`): start, submit, results,
//!   stop.
//! - `worker` - The loop each spawned worker task runs.

mod config;
mod manager;
mod state;
pub(crate) mod worker;

#[cfg(test)]
mod tests;

pub use config::*;
pub use manager::*;
pub use state::*;
