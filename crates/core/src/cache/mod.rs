//! SQLite-backed generational cache store.
//!
//! This module provides a persistent request/response store using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named cache generations, one of which is current at a time
//! - Request keys derived from the normalized method and URL
//! - A pending mutation queue replayed on sync
//! - A small metadata table for worker bookkeeping
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod meta;
pub mod migrations;
pub mod pending;

pub use crate::Error;

pub use connection::CacheDb;
pub use generations::Generation;
pub use pending::PendingRequest;
