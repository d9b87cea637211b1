//! Decoding of a transport's response stream into documents.
//!
//! A find call hands back a stream of JSON strings. [`QueryResult::from_stream`]
//! drains that stream, peeling off the query plan when [`FindOptions`] asked
//! for one and parsing every remaining response with the OJAI codec.

use futures::{Stream, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::{
    document::Document,
    error::{OjaiError, OjaiResult},
    value::Map,
};

/// Options controlling how find results are decoded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FindOptions {
    /// Whether the first response carries the query plan.
    pub include_query_plan: bool,
    /// Whether results are exposed as [`Document`]s rather than plain maps.
    pub result_as_document: bool,
}

impl FindOptions {
    /// Creates a new builder for constructing find options.
    pub fn builder() -> FindOptionsBuilder {
        FindOptionsBuilder::new()
    }
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            include_query_plan: false,
            result_as_document: true,
        }
    }
}

/// Builder for constructing [`FindOptions`] instances.
pub struct FindOptionsBuilder {
    include_query_plan: Option<bool>,
    result_as_document: Option<bool>,
}

impl FindOptionsBuilder {
    /// Creates a new builder with no options set.
    pub fn new() -> Self {
        Self {
            include_query_plan: None,
            result_as_document: None,
        }
    }

    /// Requests the query plan as the first response.
    pub fn with_include_query_plan(mut self, include: bool) -> Self {
        self.include_query_plan = Some(include);
        self
    }

    /// Chooses between documents and plain maps for the results.
    pub fn with_result_as_document(mut self, as_document: bool) -> Self {
        self.result_as_document = Some(as_document);
        self
    }

    /// Builds and returns the [`FindOptions`].
    ///
    /// Uses defaults for any unset values (no query plan, documents).
    pub fn build(self) -> FindOptions {
        let defaults = FindOptions::default();
        FindOptions {
            include_query_plan: self.include_query_plan.unwrap_or(defaults.include_query_plan),
            result_as_document: self.result_as_document.unwrap_or(defaults.result_as_document),
        }
    }
}

impl Default for FindOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A single decoded result.
#[derive(Debug, Clone, PartialEq)]
pub enum FoundRecord {
    /// Decoded with `result_as_document` set.
    Document(Document),
    /// Decoded as a plain map.
    Map(Map),
}

impl FoundRecord {
    /// Borrows the record's root map regardless of representation.
    pub fn as_map(&self) -> &Map {
        match self {
            Self::Document(document) => document.as_map(),
            Self::Map(map) => map,
        }
    }

    /// Converts the record into a [`Document`].
    pub fn into_document(self) -> Document {
        match self {
            Self::Document(document) => document,
            Self::Map(map) => Document::from_map(map),
        }
    }
}

/// The decoded outcome of a find call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    records: Vec<FoundRecord>,
    query_plan: Option<String>,
}

impl QueryResult {
    /// Drains a response stream into a result set.
    ///
    /// # Arguments
    ///
    /// * `stream` - Responses from the transport, one JSON string each
    /// * `options` - The options the find call was issued with
    ///
    /// # Errors
    ///
    /// Returns [`OjaiError::Serialization`] if the plan was requested but the
    /// stream is empty, or if a response is not a JSON object. Errors yielded
    /// by the stream itself are passed through.
    pub async fn from_stream<S>(stream: S, options: &FindOptions) -> OjaiResult<Self>
    where
        S: Stream<Item = OjaiResult<String>>,
    {
        let mut stream = std::pin::pin!(stream);

        let query_plan = if options.include_query_plan {
            match stream.try_next().await? {
                Some(plan) => Some(plan),
                None => {
                    log::error!("Response stream ended before the query plan");
                    return Err(OjaiError::Serialization(
                        "invalid response stream, the query plan must be included in the response stream"
                            .to_string(),
                    ));
                }
            }
        } else {
            None
        };

        let mut records = Vec::new();
        while let Some(response) = stream.try_next().await? {
            let document = Document::from_json(&response)?;
            records.push(if options.result_as_document {
                FoundRecord::Document(document)
            } else {
                FoundRecord::Map(document.into_map())
            });
        }

        log::debug!("Decoded {} find results", records.len());

        Ok(Self { records, query_plan })
    }

    /// Returns every decoded record in stream order.
    pub fn records(&self) -> &[FoundRecord] {
        &self.records
    }

    /// Returns the results that were decoded as documents.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.records.iter().filter_map(|record| match record {
            FoundRecord::Document(document) => Some(document),
            FoundRecord::Map(_) => None,
        })
    }

    /// Returns the root map of every result.
    pub fn maps(&self) -> impl Iterator<Item = &Map> {
        self.records.iter().map(FoundRecord::as_map)
    }

    /// Returns the query plan, if one was requested.
    pub fn query_plan(&self) -> Option<&str> {
        self.query_plan.as_deref()
    }

    /// Number of decoded records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the stream carried no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consumes the result, converting every record into a [`Document`].
    pub fn into_documents(self) -> Vec<Document> {
        self.records.into_iter().map(FoundRecord::into_document).collect()
    }
}
