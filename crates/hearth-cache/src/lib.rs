//! # Hearth Cache
//!
//! An expiring key/value store with optional file persistence, used for
//! dedup ledgers (greeting history, poll voters) and other state that should
//! survive a process restart but is not precious.
//!
//! Entries carry the epoch second they were written. A key is *present* only
//! while its entry exists and, when expiration is enabled, its age is still
//! inside the TTL window. Setting the TTL to zero or a negative value
//! disables expiration entirely.
//!
//! When a backing file is supplied, the whole file is read once at
//! construction (expired and malformed lines are dropped, never resurrected)
//! and the full in-memory map is rewritten to it immediately and then every
//! ten seconds. This is a full-replace strategy, not an append log.
//!
//! ```rust,ignore
//! use hearth_cache::Store;
//!
//! let store = Store::in_memory(3600);
//! store.put("medge", "greeted");
//! assert!(!store.absent("medge"));
//! ```

mod store;

pub use store::{CacheError, CacheResult, Store};

/// Field separator used in persisted cache lines (`key|value|timestamp`).
pub const FIELD_SEPARATOR: char = '|';

/// Interval between full flushes of a persistent store.
pub const FLUSH_INTERVAL_SECS: u64 = 10;
