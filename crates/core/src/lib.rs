//! Core types and shared functionality for sw-cache.
//!
//! This crate provides:
//! - Generational cache store with SQLite backend
//! - Pending mutation queue for deferred replay
//! - Request/response value types shared by the worker and server
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, Generation, PendingRequest};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Request, Response, ResponseSource};
