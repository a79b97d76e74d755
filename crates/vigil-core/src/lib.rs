//! vigil-core
//!
//! Core building blocks for the vigil roster monitor: a polling scheduler
//! that periodically checks monitored subjects against a reference source,
//! detects living-to-deceased transitions, and routes each detection to
//! exactly one delivery channel.
//!
//! # Module layout
//! - **domain**: data model (ids, subject, cadence, cycle results, events)
//! - **ports**: abstraction layer (SubjectStore, ReferenceLookup, Clock,
//!   WakeRequester, PushSender)
//! - **app**: application logic (scheduler, poll executor, change detection,
//!   notification dispatch, status views)
//! - **impls**: provided adapters (in-memory store, Wikidata lookup,
//!   HTTP push gateway)

pub mod app;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
