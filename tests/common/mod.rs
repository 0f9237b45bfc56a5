//! Common test utilities
//!
//! This module provides shared functionality for integration tests including:
//! - Storage doubles for deterministic cancellation and fault injection
//! - Test helper functions and fixtures
#![allow(dead_code)]

pub mod mock_storage;
pub mod test_helpers;
