//! Client-side document model and expression builders for OJAI document stores.
//!
//! This crate is the core of the ojai project and provides:
//!
//! - **Values** ([`value`]) - The JSON-like value model with typed scalars
//! - **Field paths** ([`path`]) - Parsing of dotted and indexed field paths
//! - **Documents** ([`document`]) - A mutable document tree addressed by field paths
//! - **Wire codec** ([`codec`]) - Conversion between values and OJAI extended JSON
//! - **Mutations** ([`mutation`]) - Builder for atomic document mutations
//! - **Conditions** ([`condition`]) - Compiler for nested boolean conditions
//! - **Queries** ([`query`]) - Assembly of select, where, order, offset and limit clauses
//! - **Pagination** ([`page`]) - Page parameters that translate into offset and limit
//! - **Payloads and results** ([`payload`], [`result`]) - The seam to a transport
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use ojai_core::{condition::{Comparison, Condition}, query::Query};
//!
//! let condition = Condition::new()
//!     .and()
//!     .equals("city", "Dallas")
//!     .is("age", Comparison::GreaterOrEqual, 21)
//!     .close()
//!     .build()?;
//!
//! let query = Query::new()
//!     .select(&["name", "age"])
//!     .where_condition(&condition)?
//!     .limit(10)?
//!     .build();
//!
//! let payload = query.to_json_string()?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as ojai_core;

pub mod codec;
pub mod condition;
pub mod document;
pub mod error;
pub mod merge;
pub mod mutation;
pub mod page;
pub mod path;
pub mod payload;
pub mod query;
pub mod result;
pub mod value;
