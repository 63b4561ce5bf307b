//! Compile typed GraphQL selection shapes into documents, run them once per shape and
//! materialize the responses back into the declared shape.
//!
//! The pipeline is:
//!
//! 1. a caller describes what to select with the [`shape`] builders,
//! 2. the [`analyzer`] resolves that description against a [`Schema`],
//! 3. explicitly marked fragments are lifted by the [`fragments`] extractor,
//! 4. operation parameters become GraphQL variables in [`variables`],
//! 5. the [`document`] synthesizer renders the GraphQL text,
//! 6. the [`QueryCompiler`] caches the result per [`ShapeKey`],
//! 7. the [`Executor`] hands the document to a [`Transport`],
//! 8. the [`materializer`] turns the JSON response back into the declared shape.
//!
//! [`Client`] wires all of this together.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub mod analyzer;
mod cache;
mod client;
mod compiler;
mod configuration;
mod display_helpers;
pub mod document;
pub mod error;
mod executor;
pub mod fragments;
pub mod graphql;
pub mod json_ext;
pub mod materializer;
pub mod operation;
pub mod schema;
pub mod shape;
pub mod variables;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use crate::client::Client;
pub use crate::client::TypedResponse;
pub use crate::compiler::CompiledQuery;
pub use crate::compiler::QueryCompiler;
pub use crate::configuration::CacheConfiguration;
pub use crate::configuration::Configuration;
pub use crate::configuration::DocumentConfiguration;
pub use crate::error::CompileError;
pub use crate::error::ExecutionError;
pub use crate::error::MaterializeError;
pub use crate::error::QueryError;
pub use crate::error::SchemaError;
pub use crate::error::TransportError;
pub use crate::executor::Executor;
pub use crate::executor::Transport;
pub use crate::schema::Schema;
pub use crate::shape::ShapeKey;
