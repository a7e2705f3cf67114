//! Error types for the index manager repository.
//!
//! This module provides a unified error type for all cluster operations.

mod tim_error;

pub use tim_error::TimError;
