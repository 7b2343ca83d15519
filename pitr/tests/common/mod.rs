//! Shared helpers for the collector integration tests.
//!
//! Provides a blob store wrapper injecting failures, a scripted extractor and a fake
//! `mysqlbinlog` executable for exercising the real extractor.

#![allow(dead_code)]

pub mod blob_store;
pub mod exporter;
pub mod extractor;
