//! Test utilities for QueryLite integration tests
//!
//! - TestFixture: a coordinator with known principals and bindings
//! - CancellingSink / CancellingWriter: cancel a context after N rows
//! - FailingWriter: an output that breaks after N writes

#![allow(dead_code)]

pub mod cancelling;
pub mod failing;
pub mod test_fixture;
