//! Core type definitions for Porter.
//!
//! Broken down into submodules:
//! - `context`: request-scoped inputs (role, language, dashboard, history, image)
//! - `stage`: structured outputs of each pipeline stage
//! - `response`: the envelope returned to callers
//! - `speech`: audio units and speech session state

mod context;
mod response;
mod speech;
mod stage;

pub use context::*;
pub use response::*;
pub use speech::*;
pub use stage::*;
