//! Image normalization pipeline.
//!
//! Confirmed uploads are streamed through a normalizer that corrects EXIF
//! orientation, shrinks the image to fit the configured bounds, and
//! re-encodes to WebP. The normalizer exposes a transform stage plus a
//! deferred metadata future that resolves only once the output stream has
//! been fully produced; orchestrating code must await both the destination
//! write and that future.

pub mod normalizer;
mod orientation;

pub use normalizer::{
    ImageNormalizer, MetadataHandle, NormalizeJob, NormalizeOptions, NormalizedMetadata,
    ProcessingError, WebpNormalizer, WEBP_MIME,
};
