//! Core types, traits, and error definitions for Porter.
//!
//! This crate provides the foundational building blocks shared across all layers
//! of the assistant: request context, stage outputs, the model gateway and
//! speech traits, configuration, and the prompt/policy library.

pub mod config;
pub mod error;
pub mod mocks;
pub mod policy;
pub mod text;
pub mod traits;
pub mod types;

pub use error::{Error, GatewayError, GatewayErrorReason, GatewayResult, Result};
pub use traits::*;
pub use types::*;
