//! Cloud Firestore REST access: typed values, queries, atomic commits.

pub mod client;
pub mod types;
pub mod value;

pub use client::FirestoreClient;
pub use types::{structured_query, FieldFilter, FieldOperator, FirestoreDocument, Write};
pub use value::{decode_fields, encode_fields, Fields, Value};
