//! State store implementations for Stepwise.
//!
//! Both backends implement [`stepwise_core::StateStore`] and honour the same
//! contract: a patch is applied in full or not at all, every write bumps the
//! state's version, and a patch carrying a stale `expected_version` is
//! rejected with a conflict.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStateStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStateStore;
