//! Adaptive element relocation
//!
//! Keeps selectors working after a page's markup drifts:
//! - Fingerprint extraction at first successful match
//! - Candidate generation (selector fast path, then a tag-filtered scan
//!   ordered by structural proximity)
//! - Deterministic weighted similarity scoring
//! - A resolver that turns scores into `Resolved`, `NotFound` or
//!   `Ambiguous` verdicts and never guesses between near-equal matches
//!
//! Everything here is synchronous and read-only over already parsed trees.

pub mod candidates;
pub mod distance;
pub mod errors;
pub mod fingerprint;
pub mod policy;
pub mod resolver;
pub mod scorer;
pub mod types;

pub use candidates::*;
pub use errors::*;
pub use fingerprint::*;
pub use policy::*;
pub use resolver::*;
pub use scorer::*;
pub use types::*;
