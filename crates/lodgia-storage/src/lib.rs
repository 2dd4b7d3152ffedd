//! Object storage gateway for the lodgia media backend.
//!
//! The [`ObjectStorage`] trait is the contract the upload coordinators
//! depend on: signed PUT URL issuance, existence/metadata probing, streaming
//! read/write, and deletion. Backends: S3-compatible stores via
//! `object_store` and an in-memory store for development and tests.

pub mod factory;
pub mod keys;
pub mod memory;
pub mod s3;
pub mod traits;
pub mod urls;

pub use factory::{create_storage, create_url_builder};
pub use memory::MemoryObjectStorage;
pub use s3::S3ObjectStorage;
pub use traits::{
    HeadObject, ObjectStorage, ObjectStream, PutObjectRequest, SignedPutRequest, SignedPutUrl,
    StorageError, StorageResult,
};
pub use urls::{CdnUrlBuilder, MediaUrlBuilder, PassthroughUrlBuilder};
