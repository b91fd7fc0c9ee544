//! Driftproof - adaptive element relocation for scrapers
//!
//! Selectors break when a page's markup drifts. Driftproof fingerprints an
//! element the first time a selector finds it, and when the selector later
//! comes back empty it relocates the element by similarity instead of
//! silently returning nothing.
//!
//! The engine lives in three crates re-exported here:
//! - [`dom_snapshot`] - read-only document tree and collaborator ports
//! - [`element_relocator`] - fingerprints, candidates, scoring, verdicts
//! - [`fingerprint_store`] - bounded LRU store of fingerprints
//!
//! This crate adds the session facade, configuration loading and logging
//! bootstrap.

pub mod config;
pub mod session;
pub mod telemetry;

pub use dom_snapshot;
pub use element_relocator;
pub use fingerprint_store;

pub use config::{
    default_config_path, load_config, load_config_with_options, ConfigError, DriftproofConfig,
    LoadOptions,
};
pub use session::{ScrapeSession, SelectMode, Selection, SessionOptions};
pub use telemetry::{init_json_logging, init_logging};
