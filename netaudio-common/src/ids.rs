//! Identifier types shared between the multiplexer and its consumers

use serde::{Deserialize, Serialize};

/// Index of an inbound stream within the multiplexer's stream table
pub type StreamIndex = usize;

/// Registration handle a multiplexer assigns to each consumer
///
/// Used only for diagnostics and log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsumerId(pub u32);

impl std::fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "input[{}]", self.0)
    }
}
