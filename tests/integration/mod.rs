//! Integration tests for share-scribe
//!
//! These tests run saved share-page snapshots through the whole pipeline:
//! discovery, extraction, Markdown and the standalone HTML page.

mod conversations;
mod edge_cases;
