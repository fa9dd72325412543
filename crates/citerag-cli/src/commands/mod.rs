//! CLI command handlers

pub mod ask;
pub mod config;
pub mod documents;
pub mod ingest;
pub mod serve;
