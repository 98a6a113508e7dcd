//! Grok Public API - public chat and image editor endpoints over pooled upstream tokens
//!
//! This library provides a thin HTTP façade with:
//!
//! - **Public chat**: model listing and chat completions, JSON or SSE streaming
//! - **Image editor**: text-to-image with aspect-ratio normalization, and image edit
//! - **Token pools**: per-model pool fallback with round-robin and failure cooldown
//! - **Public key auth**: optional shared key via `Authorization: Bearer` or `x-api-key`
//! - **Metrics & Monitoring**: Prometheus metrics for observability
//!
//! # Architecture
//!
//! - [`core`]: config, errors, logging context, metrics, middleware
//! - [`api`]: HTTP handlers, request/response models and the router
//! - [`services`]: model catalog, token manager and the upstream collaborators
//!
//! # Configuration
//!
//! Configuration is read from `CONFIG_PATH` (default `config.yaml`) when present,
//! otherwise from environment variables:
//! - `HOST`: Server bind address (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8000)
//! - `UPSTREAM_BASE_URL`: Upstream API base URL
//! - `PUBLIC_KEY`: Shared key for the public POST routes (unset means open)
//! - `PUBLIC_ENABLED`: Set to false to reject all public POST routes
//! - `TOKEN_FILE`: JSON file of pooled tokens, reloaded when modified
//! - `VERIFY_SSL`: Verify SSL certificates for upstream (default: true)
//! - `REQUEST_TIMEOUT_SECS`: Request timeout in seconds (default: 300)

pub mod api;
pub mod core;
pub mod services;

// Re-export commonly used types for convenience
pub use api::{build_router, public_router, AppState, PublicApiDoc};
pub use core::{AppConfig, AppError, Result};
pub use services::{ModelCatalog, PoolTokenManager, TokenManager};
