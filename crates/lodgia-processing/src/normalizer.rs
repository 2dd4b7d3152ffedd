//! Streaming image normalizer: decode, orient, fit within bounds, encode
//! WebP, report metadata at end-of-stream.

use crate::orientation;
use bytes::Bytes;
use image::imageops::FilterType;
use image::GenericImageView;
use lodgia_core::ByteStream;
use futures::StreamExt;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

pub const WEBP_MIME: &str = "image/webp";

const OUTPUT_CHUNK_BYTES: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to read source stream: {0}")]
    Read(#[from] std::io::Error),

    #[error("Source object is empty")]
    EmptyInput,

    #[error("Normalization canceled before completion")]
    Canceled,
}

impl From<ProcessingError> for lodgia_core::AppError {
    fn from(err: ProcessingError) -> Self {
        lodgia_core::AppError::ImageProcessing(err.to_string())
    }
}

/// Bounds and encoder settings for one normalization run.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// WebP quality, 0-100.
    pub quality: f32,
}

/// Final dimensions, byte count, and mime of the normalized output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedMetadata {
    pub width: u32,
    pub height: u32,
    pub bytes: u64,
    pub mime: &'static str,
}

/// Resolves once the transform's output stream has been fully produced.
pub struct MetadataHandle {
    receiver: oneshot::Receiver<Result<NormalizedMetadata, ProcessingError>>,
}

impl MetadataHandle {
    pub async fn wait(self) -> Result<NormalizedMetadata, ProcessingError> {
        self.receiver.await.map_err(|_| ProcessingError::Canceled)?
    }
}

/// A running normalization: the output stream to pipe into the destination
/// write, and the deferred metadata. Await both.
pub struct NormalizeJob {
    pub output: ByteStream,
    pub metadata: MetadataHandle,
}

/// Normalization pipeline contract consumed by the upload coordinators.
pub trait ImageNormalizer: Send + Sync {
    fn normalize(&self, source: ByteStream, options: NormalizeOptions) -> NormalizeJob;
}

/// WebP-encoding normalizer. The codec necessarily holds one decoded frame;
/// input and output still move as chunk streams so backpressure reaches the
/// source read.
pub struct WebpNormalizer;

impl ImageNormalizer for WebpNormalizer {
    fn normalize(&self, source: ByteStream, options: NormalizeOptions) -> NormalizeJob {
        let (chunk_tx, chunk_rx) = mpsc::channel::<std::io::Result<Bytes>>(8);
        let (metadata_tx, metadata_rx) = oneshot::channel();

        tokio::spawn(run_normalize(source, options, chunk_tx, metadata_tx));

        let output = futures::stream::unfold(chunk_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });

        NormalizeJob {
            output: Box::pin(output),
            metadata: MetadataHandle {
                receiver: metadata_rx,
            },
        }
    }
}

async fn run_normalize(
    mut source: ByteStream,
    options: NormalizeOptions,
    chunk_tx: mpsc::Sender<std::io::Result<Bytes>>,
    metadata_tx: oneshot::Sender<Result<NormalizedMetadata, ProcessingError>>,
) {
    let start = std::time::Instant::now();

    let transformed = async {
        let mut input = Vec::new();
        while let Some(chunk) = source.next().await {
            input.extend_from_slice(&chunk?);
        }
        if input.is_empty() {
            return Err(ProcessingError::EmptyInput);
        }

        // Decode and orient. CPU-bound, but bounded by the configured max
        // input size, so it stays inline with the task.
        let img = image::load_from_memory(&input)
            .map_err(|e| ProcessingError::Decode(e.to_string()))?;
        let img = orientation::apply_exif_orientation(img, &input);

        let (width, height) = img.dimensions();
        let img = if width > options.max_width || height > options.max_height {
            img.resize(options.max_width, options.max_height, FilterType::Lanczos3)
        } else {
            img
        };
        let (out_width, out_height) = img.dimensions();

        let rgba = img.to_rgba8();
        let encoder = webp::Encoder::from_rgba(rgba.as_raw(), out_width, out_height);
        let encoded = encoder.encode(options.quality);

        tracing::debug!(
            input_bytes = input.len(),
            output_bytes = encoded.len(),
            width = out_width,
            height = out_height,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Image normalized"
        );

        Ok((out_width, out_height, Bytes::copy_from_slice(&encoded)))
    }
    .await;

    match transformed {
        Ok((width, height, data)) => {
            let total_bytes = data.len() as u64;
            let mut offset = 0;
            while offset < data.len() {
                let end = (offset + OUTPUT_CHUNK_BYTES).min(data.len());
                if chunk_tx.send(Ok(data.slice(offset..end))).await.is_err() {
                    // Downstream dropped the output; nobody will see metadata
                    // either, so just record cancellation.
                    let _ = metadata_tx.send(Err(ProcessingError::Canceled));
                    return;
                }
                offset = end;
            }
            drop(chunk_tx);
            let _ = metadata_tx.send(Ok(NormalizedMetadata {
                width,
                height,
                bytes: total_bytes,
                mime: WEBP_MIME,
            }));
        }
        Err(err) => {
            let _ = chunk_tx
                .send(Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    err.to_string(),
                )))
                .await;
            let _ = metadata_tx.send(Err(err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Bytes {
        let mut img = RgbaImage::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = Rgba([180, 40, 40, 255]);
        }
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .expect("encode png");
        Bytes::from(buffer)
    }

    fn byte_stream(data: Bytes) -> ByteStream {
        // Feed in small chunks to exercise the accumulation path.
        let chunks: Vec<std::io::Result<Bytes>> = data
            .chunks(1024)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        Box::pin(futures::stream::iter(chunks))
    }

    #[tokio::test]
    async fn test_normalize_shrinks_to_fit_and_reports_metadata() {
        let source = byte_stream(png_bytes(200, 100));
        let job = WebpNormalizer.normalize(
            source,
            NormalizeOptions {
                max_width: 64,
                max_height: 64,
                quality: 80.0,
            },
        );

        let chunks: Vec<Bytes> = job.output.try_collect().await.expect("collect output");
        let output: Vec<u8> = chunks.concat();
        let metadata = job.metadata.wait().await.expect("metadata");

        // Aspect ratio preserved within the bounds.
        assert_eq!(metadata.width, 64);
        assert_eq!(metadata.height, 32);
        assert_eq!(metadata.mime, "image/webp");
        assert_eq!(metadata.bytes, output.len() as u64);
        assert!(metadata.bytes > 0);

        let decoded = image::load_from_memory(&output).expect("decode webp output");
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 32);
    }

    #[tokio::test]
    async fn test_normalize_never_enlarges() {
        let source = byte_stream(png_bytes(10, 8));
        let job = WebpNormalizer.normalize(
            source,
            NormalizeOptions {
                max_width: 100,
                max_height: 100,
                quality: 80.0,
            },
        );

        let _chunks: Vec<Bytes> = job.output.try_collect().await.expect("collect output");
        let metadata = job.metadata.wait().await.expect("metadata");
        assert_eq!((metadata.width, metadata.height), (10, 8));
    }

    #[tokio::test]
    async fn test_normalize_rejects_garbage() {
        let source = byte_stream(Bytes::from_static(b"definitely not an image"));
        let job = WebpNormalizer.normalize(
            source,
            NormalizeOptions {
                max_width: 64,
                max_height: 64,
                quality: 80.0,
            },
        );

        let collected: Result<Vec<Bytes>, _> = job.output.try_collect().await;
        assert!(collected.is_err());
        assert!(matches!(
            job.metadata.wait().await,
            Err(ProcessingError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_normalize_rejects_empty_source() {
        let source: ByteStream = Box::pin(futures::stream::empty());
        let job = WebpNormalizer.normalize(
            source,
            NormalizeOptions {
                max_width: 64,
                max_height: 64,
                quality: 80.0,
            },
        );

        let collected: Result<Vec<Bytes>, _> = job.output.try_collect().await;
        assert!(collected.is_err());
        assert!(matches!(
            job.metadata.wait().await,
            Err(ProcessingError::EmptyInput)
        ));
    }
}
