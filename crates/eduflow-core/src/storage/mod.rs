//! Storage layer
//!
//! Persists the seven collections as independent JSON blobs in a key-value
//! store.
//!
//! ## Architecture
//!
//! - **`KeyValueStore`**: opaque byte store (`FileStore` on disk,
//!   `MemoryStore` for tests and embedding)
//! - **`Persistence`**: maps `Tables` onto stable keys and back
//!
//! Every successful mutation rewrites the full snapshot; there is no
//! incremental or batched write path.

pub mod backend;
pub mod error;
pub mod persistence;

pub use backend::{FileStore, KeyValueStore, MemoryStore};
pub use error::{StorageError, StorageResult};
pub use persistence::{keys, Persistence, StorageStats};
