//! Payload Record - What The QR Code Carries
//!
//! The record is built once per run and serialized once. Field order is
//! fixed by the struct, so the JSON form is deterministic for a pinned timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode payload: {0}")]
    Decode(#[source] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadRecord {
    pub timestamp: DateTime<Utc>,
    pub ai: String,
    pub minting_id: String,
    pub name: String,
    pub description: String,
}

impl PayloadRecord {
    pub fn builder() -> PayloadBuilder {
        PayloadBuilder::default()
    }

    /// Compact JSON, no whitespace
    pub fn encode(&self) -> Result<String, PayloadError> {
        serde_json::to_string(self).map_err(PayloadError::Encode)
    }

    pub fn decode(data: &[u8]) -> Result<Self, PayloadError> {
        serde_json::from_slice(data).map_err(PayloadError::Decode)
    }
}

/// Builder for [`PayloadRecord`]. Field content is not validated.
#[derive(Debug, Clone, Default)]
pub struct PayloadBuilder {
    timestamp: Option<DateTime<Utc>>,
    ai: String,
    minting_id: String,
    name: String,
    description: String,
}

impl PayloadBuilder {
    /// Pin the timestamp. Without this, `build` stamps the current instant.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn ai(mut self, ai: impl Into<String>) -> Self {
        self.ai = ai.into();
        self
    }

    pub fn minting_id(mut self, minting_id: impl Into<String>) -> Self {
        self.minting_id = minting_id.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn build(self) -> PayloadRecord {
        PayloadRecord {
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            ai: self.ai,
            minting_id: self.minting_id,
            name: self.name,
            description: self.description,
        }
    }
}
