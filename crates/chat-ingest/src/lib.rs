//! Batch importer for externally sourced webhook payloads
//!
//! Reads a directory of JSON payload files once, turns each into message
//! inserts or status updates, and applies them to the shared message store.
//! It never broadcasts; connected clients see imported data on their next fetch.

pub mod ingest;
pub mod payload;

pub use ingest::{IngestError, IngestReport, Ingestor};
pub use payload::{parse_payload, IncomingMessage, PayloadError, PayloadEvent};
