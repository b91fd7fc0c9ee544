//! Session-scoped fingerprint store
//!
//! Maps caller-defined element keys to fingerprints with least-recently-used
//! eviction. The store is the only shared mutable state of a relocation
//! session; access goes through one short mutex-guarded critical section and
//! never performs I/O while the lock is held.

pub mod codec;
pub mod errors;
pub mod store;

pub use codec::{FingerprintCodec, JsonCodec, PersistedEntry};
pub use errors::StoreError;
pub use store::{ElementKey, FingerprintStore, StoreConfig, StoreEntry};
