//! Content validation shared by both upload flows. Applied twice: to the
//! client-declared values at reservation time and to the storage-probed
//! values at confirmation time (the declared values are untrusted).

use lodgia_core::AppError;

/// Mime allow-list check. Absent mime skips the check, as does an empty
/// allow-list.
pub fn assert_allowed_mime(allowed: &[String], mime: Option<&str>) -> Result<(), AppError> {
    let Some(mime) = mime else {
        return Ok(());
    };
    if allowed.is_empty() {
        return Ok(());
    }

    let normalized = mime.to_lowercase();
    if !allowed.iter().any(|entry| entry == &normalized) {
        return Err(AppError::InvalidMime(
            "Invalid image mime type".to_string(),
        ));
    }
    Ok(())
}

/// Size ceiling check. Absent size skips the check.
pub fn assert_size_within_limit(size: Option<i64>, max_bytes: i64) -> Result<(), AppError> {
    if let Some(size) = size {
        if size > max_bytes {
            return Err(AppError::SizeExceeded {
                size,
                max: max_bytes,
            });
        }
    }
    Ok(())
}
