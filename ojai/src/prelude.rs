//! Convenient re-exports of commonly used types from ojai.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use ojai::prelude::*;
//! ```
//!
//! This provides access to:
//! - The value model and documents
//! - Mutation, condition and query builders
//! - Result decoding and the payload trait
//! - Error types

pub use ojai_core::{
    value::{Value, Map},
    path::{FieldPath, Segment},
    document::Document,
    mutation::{DocumentMutation, MutationOp},
    condition::{Condition, ConditionOp, Comparison, LogicalOp},
    query::{Query, QueryClause, SortOrder},
    page::{PaginationParams, PaginationParamsBuilder},
    payload::WirePayload,
    result::{FindOptions, FindOptionsBuilder, FoundRecord, QueryResult},
    error::{OjaiError, OjaiResult},
};
