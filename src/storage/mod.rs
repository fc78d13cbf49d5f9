//! Storage collaborator
//!
//! - **store**: the [`SeriesStore`] trait every backend implements, and its errors
//! - **memory**: [`MemoryStore`], an in-memory backend used by the CLI and tests

pub mod memory;
pub mod store;

pub use memory::{MemoryStore, SeriesRecord};
pub use store::{SeriesStore, StoreError, StoreResult};
