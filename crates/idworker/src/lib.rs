//! Twitter-style Snowflake IDs from a fixed worker and datacenter id.
//!
//! An [`IdWorker`] packs a 41-bit millisecond timestamp, a 5-bit datacenter
//! id, a 5-bit worker id and a 12-bit sequence into a positive 64-bit
//! integer. IDs are unique across a fleet as long as every running worker has
//! its own `(worker_id, datacenter_id)` pair, and they sort by generation
//! time.
//!
//! ```
//! use idworker::{IdWorker, SystemClock};
//!
//! let worker = IdWorker::new(1, 1, SystemClock::default());
//! let a = worker.next_id().unwrap();
//! let b = worker.next_id().unwrap();
//! assert!(a < b);
//! assert!(i64::from(b) > 0);
//! ```

mod config;
mod error;
mod generator;
mod id;
mod mutex;
mod status;
mod time;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::status::*;
pub use crate::time::*;
