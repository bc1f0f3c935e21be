//! Narrow client for the Firestore REST API.
//!
//! The coordinators only ever see the [`FirestoreClient`] trait: path
//! addressed reads (optionally field masked), structured and aggregation
//! queries, atomic multi-write batches, and read-then-conditional-commit
//! transactions. Wire-format encode/decode lives in [`value`] and stays out
//! of the business logic.

pub mod client;
pub mod paths;
pub mod query;
pub mod value;
pub mod write;

pub use client::{BatchGetResult, Document, FirestoreClient, RestFirestoreClient};
pub use query::{Filter, StructuredQuery};
pub use value::FirestoreValue;
pub use write::{FieldTransform, Precondition, Write};

#[derive(Debug, thiserror::Error)]
pub enum FirestoreError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("firestore error {code}: {message}")]
    Status { code: u16, message: String },
    #[error("response decode error: {0}")]
    Decode(String),
    #[error("token error: {0}")]
    Token(String),
}
