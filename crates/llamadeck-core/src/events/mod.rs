//! Streaming query events.
//!
//! Every streaming query produces exactly one `Start`, zero or more `Data`
//! chunks in arrival order, then exactly one terminal event (`End` or
//! `Error`). Events are correlated by [`QueryId`].
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag for the UI layer:
//!
//! ```json
//! { "type": "stream-data", "queryId": "streaming-3", "chunk": "Hello" }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Event name constants.
///
/// Keep strings stable; UI listeners bind to them.
pub mod names {
    pub const STREAM_START: &str = "stream-start";
    pub const STREAM_DATA: &str = "stream-data";
    pub const STREAM_END: &str = "stream-end";
    pub const STREAM_ERROR: &str = "stream-error";
}

/// Identifier correlating all events of one query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(String);

impl QueryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One event of a streaming query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// The process was spawned (or the query was accepted and failed before spawning).
    #[serde(rename = "stream-start")]
    Start {
        #[serde(rename = "queryId")]
        query_id: QueryId,
    },

    /// An incremental chunk of standard output.
    #[serde(rename = "stream-data")]
    Data {
        #[serde(rename = "queryId")]
        query_id: QueryId,
        chunk: String,
    },

    /// The query completed; carries the full accumulated response.
    #[serde(rename = "stream-end")]
    End {
        #[serde(rename = "queryId")]
        query_id: QueryId,
        #[serde(rename = "fullResponse")]
        full_response: String,
    },

    /// The query failed.
    #[serde(rename = "stream-error")]
    Error {
        #[serde(rename = "queryId")]
        query_id: QueryId,
        message: String,
    },
}

impl StreamEvent {
    /// Stable event name for transport layers.
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Start { .. } => names::STREAM_START,
            Self::Data { .. } => names::STREAM_DATA,
            Self::End { .. } => names::STREAM_END,
            Self::Error { .. } => names::STREAM_ERROR,
        }
    }

    /// Query this event belongs to.
    pub const fn query_id(&self) -> &QueryId {
        match self {
            Self::Start { query_id }
            | Self::Data { query_id, .. }
            | Self::End { query_id, .. }
            | Self::Error { query_id, .. } => query_id,
        }
    }

    /// Whether this event ends its query's sequence.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::End { .. } | Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_event_serialization() {
        let event = StreamEvent::Data {
            query_id: QueryId::new("streaming-1"),
            chunk: "Hi".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"stream-data\""));
        assert!(json.contains("\"queryId\":\"streaming-1\""));
        assert!(json.contains("\"chunk\":\"Hi\""));
    }

    #[test]
    fn end_event_uses_full_response_field() {
        let event = StreamEvent::End {
            query_id: QueryId::new("streaming-2"),
            full_response: "done".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"fullResponse\":\"done\""));
        assert_eq!(event.event_name(), names::STREAM_END);
        assert!(event.is_terminal());
    }

    #[test]
    fn start_and_data_are_not_terminal() {
        let id = QueryId::new("q");
        assert!(!StreamEvent::Start { query_id: id.clone() }.is_terminal());
        assert!(
            !StreamEvent::Data {
                query_id: id,
                chunk: String::new()
            }
            .is_terminal()
        );
    }

    #[test]
    fn event_roundtrips_through_json() {
        let event = StreamEvent::Error {
            query_id: QueryId::new("standard-9"),
            message: "fatal".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: StreamEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.query_id().as_str(), "standard-9");
    }
}
