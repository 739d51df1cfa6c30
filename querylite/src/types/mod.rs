// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Dynamic value model
//!
//! This module provides:
//! - `Value`, the dynamically typed value every query produces
//! - `Dict`, an insertion-ordered dictionary
//! - `Associative`, the member protocol used for schema discovery
//! - `any_to_string`, the display conversion used for table and CSV cells

pub mod dict;
pub mod display;
pub mod protocol;
pub mod value;

pub use dict::Dict;
pub use display::any_to_string;
pub use protocol::Associative;
pub use value::Value;
