//! Metric record store
//!
//! Durable keyed storage of server identities and their metric samples,
//! behind a trait so backends can be swapped.
//!
//! ## Backends
//!
//! - **SQLite** (default): embedded, transactional, WAL mode
//! - **In-Memory**: capability-limited variant for demo mode and tests
//!
//! ## Ordering convention
//!
//! All sample listings are chronological ascending; `tail_samples` selects
//! the most recent N without changing that order.

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use backend::{HealthStatus, MetricStore};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use schema::{MetricSample, NewSample, NewServer, ServerIdentity};
pub use sqlite::SqliteStore;
