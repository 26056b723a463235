//! # Tables Library
//!
//! Transactional batch client for Azure Table storage and the Cosmos DB table
//! API. Operations on entities that share a partition key are collected,
//! rendered into one multipart `$batch` request and submitted atomically; the
//! multipart response is decoded into per-operation results.
//!
//! ## Modules
//!
//! - [`client`] - [`TableClient`] entry point
//! - [`transaction`] - Action builder, coordinator and response decoding
//! - [`model`] - Table entities and update options
//! - [`http`] - Transport seam and the reqwest-backed sender
//! - [`config`] - Service configuration
//! - [`common`] - Shared error types
//! - [`utils`] - Environment variable helpers

pub mod client;
pub mod common;
pub mod config;
pub mod http;
pub mod model;
pub mod transaction;
pub mod utils;

pub use client::TableClient;
pub use transaction::{TableTransaction, TransactionError, TransactionResponse};
