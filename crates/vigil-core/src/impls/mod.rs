//! Provided adapters for the ports.
//!
//! - `memory_store`: in-memory SubjectStore, for the CLI and tests
//! - `wikidata`: ReferenceLookup against the Wikidata claims API
//! - `http_push`: PushSender posting to an HTTP push gateway

pub mod http_push;
pub mod memory_store;
pub mod wikidata;

pub use http_push::HttpPushSender;
pub use memory_store::InMemorySubjectStore;
pub use wikidata::WikidataLookup;
