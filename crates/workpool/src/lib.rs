#![doc = include_str!("../README.md")]

mod delay;
mod error;
mod pool;
mod task;

pub use crate::delay::*;
pub use crate::error::*;
pub use crate::pool::*;
pub use crate::task::*;
// Public re-export so callers can build the token `start` expects without
// depending on `tokio-util` directly.
pub use tokio_util::sync::CancellationToken;
