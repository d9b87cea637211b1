//! Main ojai crate for building OJAI document store requests.
//!
//! This crate is the primary entry point for users of the ojai client model.
//! It re-exports the core types and functionality so that documents, mutations,
//! conditions and queries can be built from a single import.
//!
//! # Features
//!
//! - **Document tree** - Read and write nested fields through paths like `a.b[2].c`
//! - **Typed wire format** - Longs, floats, binaries, dates and times survive the trip as OJAI extended JSON
//! - **Composable builders** - Fluent mutation, condition and query builders that fail fast on misuse
//! - **Transport agnostic** - Finished trees are plain JSON strings; responses decode back into documents
//!
//! # Quick Start
//!
//! ```ignore
//! use ojai::prelude::*;
//!
//! // Build a document
//! let mut user = Document::new();
//! user.set_id_string("user0001")?
//!     .set("name", "Alice")?
//!     .set("address.city", "Dallas")?
//!     .set("tags[0]", "admin")?;
//!
//! // Describe an update
//! let mutation = DocumentMutation::new()
//!     .increment_int_by_one("logins")?
//!     .set("address.zip", "75001")?;
//!
//! // Query for matching users
//! let condition = Condition::new()
//!     .or()
//!     .equals("address.city", "Dallas")
//!     .is("age", Comparison::Less, 30)
//!     .close()
//!     .build()?;
//!
//! let query = Query::new()
//!     .select(&["name"])
//!     .where_condition(&condition)?
//!     .order_by(SortOrder::Desc, &["age"])
//!     .build();
//!
//! // Hand the payloads to a transport
//! let insert = user.to_payload()?;
//! let update = mutation.to_payload()?;
//! let find = query.to_payload()?;
//! ```
//!
//! # Decoding Results
//!
//! A transport answers a find call with a stream of JSON strings. [`result::QueryResult`]
//! drains that stream into documents.
//!
//! ```ignore
//! use ojai::prelude::*;
//!
//! let options = FindOptions::builder().with_include_query_plan(true).build();
//! let result = QueryResult::from_stream(responses, &options).await?;
//!
//! println!("plan: {:?}", result.query_plan());
//! for document in result.documents() {
//!     println!("{:?}", document.id());
//! }
//! ```

pub mod prelude;

pub use ojai_core::{
    codec, condition, document, error, merge, mutation, page, path, payload, query, result, value,
};

// Re-export chrono for the temporal value types
pub use chrono;
