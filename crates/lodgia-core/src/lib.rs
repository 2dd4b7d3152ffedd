//! Core domain types for the lodgia media backend.
//!
//! This crate holds everything the other crates agree on: the unified
//! [`AppError`] taxonomy, environment-sourced [`Config`], the pure image
//! [`policy::ImagePolicy`] evaluator, and the persisted/transport models.

pub mod config;
pub mod error;
pub mod models;
pub mod policy;

pub use config::{Config, ImageUploadSettings};
pub use error::{AppError, ErrorMetadata, LogLevel};

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// Chunked byte stream used across the storage gateway and the normalization
/// pipeline. Items are `io::Result` so data-plane failures travel with the
/// stream rather than out of band.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;
