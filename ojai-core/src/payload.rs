//! The seam between finished trees and a transport.
//!
//! A transport never sees the value model; it receives the JSON text produced
//! by [`WirePayload::to_payload`] and hands back response strings for
//! [`crate::result::QueryResult`] to decode.

use serde_json::Value as JsonValue;

use crate::{
    condition::Condition,
    document::Document,
    error::OjaiResult,
    mutation::DocumentMutation,
    query::Query,
};

/// Anything that can be sent to the store as a request payload.
pub trait WirePayload {
    /// Renders the payload as OJAI wire JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is unfinished or holds a value the wire
    /// format cannot carry.
    fn to_wire(&self) -> OjaiResult<JsonValue>;

    /// Renders the payload as the JSON string handed to the transport.
    fn to_payload(&self) -> OjaiResult<String> {
        Ok(serde_json::to_string(&self.to_wire()?)?)
    }
}

impl WirePayload for Document {
    fn to_wire(&self) -> OjaiResult<JsonValue> {
        Document::to_wire(self)
    }
}

impl WirePayload for DocumentMutation {
    fn to_wire(&self) -> OjaiResult<JsonValue> {
        DocumentMutation::to_wire(self)
    }
}

impl WirePayload for Condition {
    fn to_wire(&self) -> OjaiResult<JsonValue> {
        Condition::to_wire(self)
    }
}

impl WirePayload for Query {
    fn to_wire(&self) -> OjaiResult<JsonValue> {
        Query::to_wire(self)
    }
}
