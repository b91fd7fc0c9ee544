//! Persistence hand-off
//!
//! The store never touches disk. A session that wants fingerprints to
//! outlive it exports them through a codec and gives the bytes to whatever
//! persistence collaborator it uses.

use chrono::{DateTime, Utc};
use element_relocator::Fingerprint;
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;
use crate::store::ElementKey;

pub trait FingerprintCodec: Send + Sync {
    fn encode(&self, fingerprint: &Fingerprint) -> Result<Vec<u8>, StoreError>;
    fn decode(&self, bytes: &[u8]) -> Result<Fingerprint, StoreError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl FingerprintCodec for JsonCodec {
    fn encode(&self, fingerprint: &Fingerprint) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(fingerprint)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Fingerprint, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// One exported store entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedEntry {
    pub key: ElementKey,
    pub last_used: DateTime<Utc>,
    pub payload: Vec<u8>,
}
