//! Core types and events for pageimg

use serde::{Deserialize, Serialize};

/// Identifier of an image element within a page snapshot
///
/// Usually the element's `id` attribute; elements without one are
/// identified by their position in document order (`img#3`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub String);

impl ElementId {
    /// Create a new ElementId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier for an element known only by its document position
    pub fn positional(index: usize) -> Self {
        Self(format!("img#{index}"))
    }

    /// Borrow the identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Image bytes plus the response metadata kept alongside them
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    /// Raw response body
    pub body: Vec<u8>,
    /// Content-Type of the response, if the server sent one
    pub content_type: Option<String>,
    /// HTTP status the body arrived with
    pub status: u16,
}

impl Payload {
    /// A 200 payload with the given body and content type
    pub fn ok(body: impl Into<Vec<u8>>, content_type: Option<&str>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.map(str::to_string),
            status: 200,
        }
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// How an image unit gets its content
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitMode {
    /// Marker attribute present: resolved through dedup, cache and network
    CacheAside,
    /// No marker: the host's own loading mechanism decides
    Native,
}

/// Progress events broadcast by [`ProgressBarrier`](crate::progress::ProgressBarrier)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A unit was registered with the barrier
    UnitAdded {
        /// Label the unit was registered under
        label: String,
        /// Registered units so far
        total: usize,
    },

    /// A unit reached the complete state
    UnitComplete {
        /// Label reported by the caller
        label: String,
        /// Units completed so far
        completed: usize,
        /// Units registered so far
        total: usize,
    },

    /// A unit reached the invalid state
    UnitInvalid {
        /// Label reported by the caller
        label: String,
        /// Units failed so far
        invalid: usize,
        /// Units registered so far
        total: usize,
    },

    /// Every registered unit is terminal; the page may be revealed
    Ready {
        /// Units that completed
        completed: usize,
        /// Units that ended invalid
        invalid: usize,
    },
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_ids_are_stable() {
        assert_eq!(ElementId::positional(3).as_str(), "img#3");
        assert_eq!(ElementId::positional(3), ElementId::from("img#3"));
    }

    #[test]
    fn ready_event_serializes_with_type_tag() {
        let json = serde_json::to_value(Event::Ready {
            completed: 4,
            invalid: 1,
        })
        .expect("serialize failed");

        assert_eq!(json["type"], "ready");
        assert_eq!(json["completed"], 4);
        assert_eq!(json["invalid"], 1);
    }

    #[test]
    fn unit_mode_uses_snake_case() {
        let json = serde_json::to_string(&UnitMode::CacheAside).expect("serialize failed");
        assert_eq!(json, "\"cache_aside\"");
    }
}
