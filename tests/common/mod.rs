//! Common test utilities and fixtures for fieldgraph-engine integration tests
//!
//! This module provides:
//! - Workbook and published-document fixtures
//! - `MemoryPublisher`, an in-process help center that records every call
//! - `FaultyLedger`, a memory ledger with tables that fail to read or write
//! - Helpers for building ledger rows and processed units

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod fakes;
pub mod fixtures;

pub use fakes::{FaultyLedger, MemoryPublisher};
pub use fixtures::*;
