#![doc = include_str!("../README.md")]
#![warn(missing_docs, missing_debug_implementations)]
mod catalog;
mod config;
mod error;
mod placement;
mod pool_allocator;
mod poolable;
mod registry;
mod scheduler;

pub use catalog::*;
pub use config::*;
pub use error::{CatalogError, CatalogIssue, PoolError, PoolResult};
pub use placement::*;
pub use pool_allocator::*;
pub use poolable::*;
pub use registry::*;
