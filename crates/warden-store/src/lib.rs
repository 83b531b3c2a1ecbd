//! Persistent [`LogStore`](warden_logs::LogStore) backends: a PostgREST `logs`
//! table and a local rotating JSONL file.

pub mod jsonl;
pub mod rest;

pub use jsonl::JsonlLogStore;
pub use rest::{RestLogStore, RestStoreConfig};
