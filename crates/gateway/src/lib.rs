//! HTTP surface for Porter.
//!
//! Exposes the multi-stage and streaming chat modes, spoken answers and the
//! voice endpoints over axum, plus health and Prometheus metrics routes.

pub mod api;
mod chat;
pub mod server;
mod voice;

pub use api::{ApiError, ChatRequest, DetailedChatResponse, StreamEvent};
pub use server::{AppState, GatewayConfig, GatewayServer, HealthResponse};
