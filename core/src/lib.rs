//! Declarative page state for reactive page runtimes.
//!
//! A page-state class is a named set of fields registered once at startup.
//! Reads and writes go through a [`PageSession`](engine::PageSession), which
//! keeps values in the session namespace and mirrors fields that declare a URL
//! key into the query parameters, following each class's ownership policy.
//! [`PersistenceBackend`](persistence::PersistenceBackend) optionally carries
//! the namespace across sessions through a remote key-value store.

pub mod api;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod host;
pub mod persistence;
pub mod registry;
pub mod schema;
pub mod value;
